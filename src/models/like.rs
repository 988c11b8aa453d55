use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A like references exactly one likeable entity. This subsystem only reads
/// likes for aggregation; toggling happens elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Like {
    pub id: Uuid,
    pub comment_id: Option<Uuid>,
    pub tweet_id: Option<Uuid>,
    pub video_id: Option<Uuid>,
    pub liked_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn for_comment(comment_id: Uuid, liked_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            comment_id: Some(comment_id),
            tweet_id: None,
            video_id: None,
            liked_by,
            created_at: Utc::now(),
        }
    }

    pub fn for_tweet(tweet_id: Uuid, liked_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            comment_id: None,
            tweet_id: Some(tweet_id),
            video_id: None,
            liked_by,
            created_at: Utc::now(),
        }
    }
}
