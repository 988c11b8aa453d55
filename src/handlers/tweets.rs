use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aggregate::{Page, PageRequest};
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Tweet, TweetView};
use crate::services::TweetService;
use crate::state::AppState;

use super::comments::PageQuery;
use super::parse_id;

#[derive(Debug, Deserialize)]
pub struct TweetBody {
    pub content: Option<String>,
}

/// POST /api/tweets - Create a tweet
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Json(body): Json<TweetBody>,
) -> ApiResult<Tweet> {
    let content = body.content.unwrap_or_default();
    let tweet = TweetService::new(state.store.clone()).create(&actor, &content).await?;
    Ok(ApiResponse::created(tweet, "tweet created successfully"))
}

/// GET /api/users/:user_id/tweets - List a user's tweets, newest first
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
    viewer: Option<Extension<CurrentUser>>,
) -> ApiResult<Page<TweetView>> {
    let user_id = parse_id(&user_id, "user")?;
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref(), &state.pages)?;
    let viewer = viewer.as_ref().map(|Extension(CurrentUser(identity))| identity);

    let tweets = TweetService::new(state.store.clone())
        .list_for_user(user_id, viewer, page)
        .await?;
    Ok(ApiResponse::new(tweets, "tweets fetched successfully"))
}

/// PATCH /api/tweets/:tweet_id - Edit a tweet (owner only)
pub async fn update(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Json(body): Json<TweetBody>,
) -> ApiResult<Tweet> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;
    let content = body.content.unwrap_or_default();

    let tweet = TweetService::new(state.store.clone())
        .edit(tweet_id, &actor, &content)
        .await?;
    Ok(ApiResponse::new(tweet, "tweet updated successfully"))
}

/// DELETE /api/tweets/:tweet_id - Delete a tweet (owner only)
pub async fn remove(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
) -> ApiResult<Value> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;

    TweetService::new(state.store.clone()).remove(tweet_id, &actor).await?;
    Ok(ApiResponse::new(json!({}), "tweet deleted successfully"))
}
