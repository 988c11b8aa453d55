use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::OwnerView;

/// A comment on a video. `owner_id` is set at creation and never changes;
/// only the owner may edit or delete the record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub video_id: Uuid,
    pub owner_id: Uuid,
}

/// Denormalized, viewer-relative projection returned by the comment list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes_count: u64,
    pub owner: OwnerView,
    pub is_liked: bool,
}
