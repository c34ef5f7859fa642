use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown resource `{id}`")]
    UnknownResource { id: String },
    #[error("duplicate resource id `{id}` in registry")]
    DuplicateResource { id: &'static str },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn unknown_resource(id: impl Into<String>) -> Self {
        Self::UnknownResource { id: id.into() }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
