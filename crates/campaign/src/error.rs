//! Error taxonomy for remote mailing operations

use std::fmt::Display;

/// Errors surfaced by the remote service and everything built on it
///
/// Kinds are preserved as errors propagate; nothing in this crate turns one
/// kind into another.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The requested list, campaign or subscriber does not exist remotely
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A lookup expected to match one entity matched several
    #[error("{entity} lookup for {key} matched {count} results")]
    AmbiguousResult {
        entity: &'static str,
        key: String,
        count: usize,
    },

    /// Input rejected by the remote service before any mutation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transport or server-side failure
    #[error("remote service error: {0}")]
    Remote(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
