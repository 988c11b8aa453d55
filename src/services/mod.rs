pub mod comment_service;
pub mod ownership;
pub mod tweet_service;

use thiserror::Error;

use crate::store::StoreError;

pub use comment_service::CommentService;
pub use tweet_service::TweetService;

/// Typed outcomes for the mutation pipeline and aggregated reads. The
/// boundary layer maps each kind to a transport status; nothing here is a
/// generic fault.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// The store reported that a write which passed every precondition did
    /// not take effect. Distinct from NotFound: it signals a store-layer
    /// anomaly, not a client error.
    #[error("{0}")]
    WriteFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Required free-text field: present and non-blank after trimming.
pub(crate) fn require_content(content: &str) -> Result<String, ServiceError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput("content is required".to_string()));
    }
    Ok(trimmed.to_string())
}
