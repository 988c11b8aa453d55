pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::{AggregateError, Page, PageRequest, Pipeline};
use crate::models::{Comment, Identity, NewComment, NewTweet, Tweet, Video};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query error: {0}")]
    Query(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence boundary for the typed collections. Implementations provide
/// atomic single-record operations plus the aggregation capability; the
/// mutating methods return the affected record, `None` when the write did
/// not take effect.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Account lookup with the secret fields already stripped.
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn find_video(&self, id: Uuid) -> Result<Option<Video>, StoreError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    async fn create_comment(&self, new: NewComment) -> Result<Option<Comment>, StoreError>;
    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, StoreError>;
    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;

    async fn find_tweet(&self, id: Uuid) -> Result<Option<Tweet>, StoreError>;
    async fn create_tweet(&self, new: NewTweet) -> Result<Option<Tweet>, StoreError>;
    async fn update_tweet(&self, id: Uuid, content: &str) -> Result<Option<Tweet>, StoreError>;
    async fn delete_tweet(&self, id: Uuid) -> Result<Option<Tweet>, StoreError>;

    /// Execute an aggregation pipeline with pagination, returning raw
    /// documents plus the total count.
    async fn aggregate(
        &self,
        pipeline: &Pipeline,
        page: &PageRequest,
    ) -> Result<Page<Value>, StoreError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
