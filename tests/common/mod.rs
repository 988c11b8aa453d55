// Shared test harness: the real router over a seeded in-memory store,
// driven in-process with tower's oneshot. No network, no database.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use vidtube_api_rust::aggregate::PageLimits;
use vidtube_api_rust::auth::{generate_access_token, Claims};
use vidtube_api_rust::models::{Account, Identity, Video};
use vidtube_api_rust::state::{AppState, AuthSettings};
use vidtube_api_rust::store::memory::MemoryStore;

pub const TEST_SECRET: &str = "test-secret";

pub fn build_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        auth: AuthSettings { jwt_secret: TEST_SECRET.to_string(), jwt_expiry_hours: 4 },
        pages: PageLimits { default_limit: 10, max_limit: 100 },
    };
    (vidtube_api_rust::app(state), store)
}

pub fn account(username: &str) -> Account {
    Account {
        id: Uuid::new_v4(),
        username: username.to_string(),
        full_name: format!("{username} Example"),
        avatar_url: Some(format!("https://cdn.example/{username}.png")),
        password_hash: "hashed-password".to_string(),
        refresh_token: Some("refresh-token".to_string()),
        created_at: Utc::now(),
    }
}

pub fn video(owner_id: Uuid) -> Video {
    Video {
        id: Uuid::new_v4(),
        owner_id,
        title: "test clip".to_string(),
        description: None,
        created_at: Utc::now(),
    }
}

pub fn token_for(identity: &Identity) -> String {
    generate_access_token(&Claims::new(identity, 4), TEST_SECRET).expect("token")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn get_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}
