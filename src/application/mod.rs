//! Application layer: collaborator seams and error aggregation.

pub mod error;
pub mod sources;

pub use error::AppError;
pub use sources::{
    ArtifactError, ArtifactFetcher, ArtifactPayload, ArtifactWriter, ContentApiError, ContentReader,
};
