//! Resource descriptors and the fixed registry of public read queries.
//!
//! A descriptor ties a logical query identity to the artifact file the
//! snapshot exporter writes and the Content API endpoint that serves the
//! same payload live. The registry is built once at process start and never
//! mutated afterwards.

use std::fmt;

use super::error::DomainError;

/// Identity of a logical public read query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(&'static str);

impl ResourceId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.0)
    }
}

/// Static mapping from a query identity to its snapshot artifact and its
/// live Content API endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    /// File name under the artifact directory, e.g. `products.json`.
    pub artifact_file: &'static str,
    /// Path on the Content API, e.g. `/api/products`.
    pub endpoint: &'static str,
}

impl ResourceDescriptor {
    pub const fn new(id: &'static str, artifact_file: &'static str, endpoint: &'static str) -> Self {
        Self {
            id: ResourceId::new(id),
            artifact_file,
            endpoint,
        }
    }
}

/// Fixed, insertion-ordered collection of resource descriptors.
///
/// Order only matters for log and report readability. Construction rejects
/// duplicate ids: an ambiguous key collision is a configuration error, not a
/// runtime condition to recover from.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    descriptors: Vec<ResourceDescriptor>,
}

impl ResourceRegistry {
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Result<Self, DomainError> {
        for (index, descriptor) in descriptors.iter().enumerate() {
            if descriptors[..index]
                .iter()
                .any(|other| other.id == descriptor.id)
            {
                return Err(DomainError::DuplicateResource {
                    id: descriptor.id.as_str(),
                });
            }
        }
        Ok(Self { descriptors })
    }

    /// The public read set of the Vetrina marketing site.
    pub fn standard() -> Result<Self, DomainError> {
        Self::new(vec![
            ResourceDescriptor::new("products", "products.json", "/api/products"),
            ResourceDescriptor::new(
                "product-categories",
                "product-categories.json",
                "/api/products/categories",
            ),
            ResourceDescriptor::new("blogposts", "blogposts.json", "/api/blogposts"),
            ResourceDescriptor::new("teammembers", "teammembers.json", "/api/teammembers"),
            ResourceDescriptor::new("testimonials", "testimonials.json", "/api/testimonials"),
            ResourceDescriptor::new("services", "services.json", "/api/services"),
            ResourceDescriptor::new("faqs", "faqs.json", "/api/faqs"),
            ResourceDescriptor::new("sitecontent", "sitecontent.json", "/api/sitecontent"),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&ResourceDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.id.as_str() == id)
    }

    /// Descriptors in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
