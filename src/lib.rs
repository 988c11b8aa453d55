pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    // Protected routes verify the credential before any resource lookup.
    let protected = Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        .route("/api/videos/:video_id/comments", post(handlers::comments::create))
        .route(
            "/api/comments/:comment_id",
            patch(handlers::comments::update).delete(handlers::comments::remove),
        )
        .route("/api/tweets", post(handlers::tweets::create))
        .route(
            "/api/tweets/:tweet_id",
            patch(handlers::tweets::update).delete(handlers::tweets::remove),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::require_auth));

    // Read routes accept anonymous viewers; a presented credential is still
    // verified because it changes the viewer-relative fields.
    let public = Router::new()
        .route("/api/videos/:video_id/comments", get(handlers::comments::list))
        .route("/api/users/:user_id/tweets", get(handlers::tweets::list))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::optional_auth));

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(handlers::health::healthz))
        .merge(protected)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "VidTube API (Rust)",
            "version": version,
            "description": "Video and social platform JSON API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/healthz (public)",
                "whoami": "/api/auth/whoami (protected)",
                "comments": "GET|POST /api/videos/:video_id/comments, PATCH|DELETE /api/comments/:comment_id",
                "tweets": "POST /api/tweets, GET /api/users/:user_id/tweets, PATCH|DELETE /api/tweets/:tweet_id",
            }
        },
        "message": "ok"
    }))
}
