use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aggregate::{Page, PageRequest};
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Comment, CommentView};
use crate::services::CommentService;
use crate::state::AppState;

use super::parse_id;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: Option<String>,
}

/// GET /api/videos/:video_id/comments - List comments for a video
///
/// Optionally authenticated: a verified viewer identity only affects the
/// per-comment `is_liked` field.
pub async fn list(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<PageQuery>,
    viewer: Option<Extension<CurrentUser>>,
) -> ApiResult<Page<CommentView>> {
    let video_id = parse_id(&video_id, "video")?;
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref(), &state.pages)?;
    let viewer = viewer.as_ref().map(|Extension(CurrentUser(identity))| identity);

    let comments = CommentService::new(state.store.clone())
        .list_for_video(video_id, viewer, page)
        .await?;
    Ok(ApiResponse::new(comments, "comments fetched successfully"))
}

/// POST /api/videos/:video_id/comments - Add a comment to a video
pub async fn create(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Json(body): Json<CommentBody>,
) -> ApiResult<Comment> {
    let video_id = parse_id(&video_id, "video")?;
    let content = body.content.unwrap_or_default();

    let comment = CommentService::new(state.store.clone())
        .add(video_id, &actor, &content)
        .await?;
    Ok(ApiResponse::created(comment, "comment added successfully"))
}

/// PATCH /api/comments/:comment_id - Edit a comment (owner only)
pub async fn update(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Json(body): Json<CommentBody>,
) -> ApiResult<Comment> {
    let comment_id = parse_id(&comment_id, "comment")?;
    let content = body.content.unwrap_or_default();

    let comment = CommentService::new(state.store.clone())
        .edit(comment_id, &actor, &content)
        .await?;
    Ok(ApiResponse::new(comment, "comment edited successfully"))
}

/// DELETE /api/comments/:comment_id - Delete a comment (owner only)
pub async fn remove(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
) -> ApiResult<Value> {
    let comment_id = parse_id(&comment_id, "comment")?;

    CommentService::new(state.store.clone())
        .remove(comment_id, &actor)
        .await?;
    Ok(ApiResponse::new(json!({}), "comment deleted successfully"))
}
