// In-memory datastore. Backs the integration tests and `APP_STORE=memory`
// development runs; aggregation reuses the document interpreter so the
// pipeline semantics match the SQL backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::aggregate::eval::{self, CollectionSource};
use crate::aggregate::{Collection, Page, PageRequest, Pipeline};
use crate::models::{Account, Comment, Identity, Like, NewComment, NewTweet, Tweet, Video};

use super::{Datastore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    videos: HashMap<Uuid, Video>,
    comments: HashMap<Uuid, Comment>,
    tweets: HashMap<Uuid, Tweet>,
    likes: HashMap<Uuid, Like>,
}

/// The lock is only ever taken inside a single trait method and released
/// before returning; nothing is held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_account(&self, account: Account) {
        self.tables.write().await.accounts.insert(account.id, account);
    }

    pub async fn seed_video(&self, video: Video) {
        self.tables.write().await.videos.insert(video.id, video);
    }

    pub async fn seed_like(&self, like: Like) {
        self.tables.write().await.likes.insert(like.id, like);
    }

    pub async fn comment_count(&self) -> usize {
        self.tables.read().await.comments.len()
    }

    async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let tables = self.tables.read().await;
        let mut docs = HashMap::new();
        docs.insert(
            Collection::Users,
            // Aggregation joins see the public projection, never the
            // secret-bearing account record.
            to_docs(tables.accounts.values().map(Identity::from))?,
        );
        docs.insert(Collection::Videos, to_docs(tables.videos.values().cloned())?);
        docs.insert(Collection::Comments, to_docs(tables.comments.values().cloned())?);
        docs.insert(Collection::Tweets, to_docs(tables.tweets.values().cloned())?);
        docs.insert(Collection::Likes, to_docs(tables.likes.values().cloned())?);
        Ok(Snapshot { docs })
    }
}

fn to_docs<T: serde::Serialize>(
    records: impl Iterator<Item = T>,
) -> Result<Vec<Value>, StoreError> {
    records
        .map(|r| serde_json::to_value(r).map_err(|e| StoreError::Query(e.to_string())))
        .collect()
}

struct Snapshot {
    docs: HashMap<Collection, Vec<Value>>,
}

impl CollectionSource for Snapshot {
    fn documents(&self, collection: Collection) -> Vec<Value> {
        self.docs.get(&collection).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.tables.read().await.accounts.get(&id).map(Identity::from))
    }

    async fn find_video(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        Ok(self.tables.read().await.videos.get(&id).cloned())
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn create_comment(&self, new: NewComment) -> Result<Option<Comment>, StoreError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            content: new.content,
            video_id: new.video_id,
            owner_id: new.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.comments.insert(comment.id, comment.clone());
        Ok(Some(comment))
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.get_mut(&id).map(|comment| {
            comment.content = content.to_string();
            comment.updated_at = Utc::now();
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.tables.write().await.comments.remove(&id))
    }

    async fn find_tweet(&self, id: Uuid) -> Result<Option<Tweet>, StoreError> {
        Ok(self.tables.read().await.tweets.get(&id).cloned())
    }

    async fn create_tweet(&self, new: NewTweet) -> Result<Option<Tweet>, StoreError> {
        let now = Utc::now();
        let tweet = Tweet {
            id: Uuid::new_v4(),
            content: new.content,
            owner_id: new.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.tweets.insert(tweet.id, tweet.clone());
        Ok(Some(tweet))
    }

    async fn update_tweet(&self, id: Uuid, content: &str) -> Result<Option<Tweet>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.tweets.get_mut(&id).map(|tweet| {
            tweet.content = content.to_string();
            tweet.updated_at = Utc::now();
            tweet.clone()
        }))
    }

    async fn delete_tweet(&self, id: Uuid) -> Result<Option<Tweet>, StoreError> {
        Ok(self.tables.write().await.tweets.remove(&id))
    }

    async fn aggregate(
        &self,
        pipeline: &Pipeline,
        page: &PageRequest,
    ) -> Result<Page<Value>, StoreError> {
        let snapshot = self.snapshot().await?;
        Ok(eval::execute(&snapshot, pipeline, page)?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
