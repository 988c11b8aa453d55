mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;
use vidtube_api_rust::models::{Identity, Like};
use vidtube_api_rust::store::Datastore;

struct Fixture {
    app: axum::Router,
    store: std::sync::Arc<vidtube_api_rust::store::memory::MemoryStore>,
    alice: Identity,
    bob: Identity,
    video_id: Uuid,
}

async fn fixture() -> Fixture {
    let (app, store) = common::build_app();
    let alice = common::account("alice");
    let bob = common::account("bob");
    let video = common::video(alice.id);
    let video_id = video.id;
    let alice_identity = Identity::from(&alice);
    let bob_identity = Identity::from(&bob);
    store.seed_account(alice).await;
    store.seed_account(bob).await;
    store.seed_video(video).await;
    Fixture { app, store, alice: alice_identity, bob: bob_identity, video_id }
}

#[tokio::test]
async fn comment_lifecycle_with_ownership_enforcement() -> Result<()> {
    let f = fixture().await;
    let alice_token = common::token_for(&f.alice);
    let bob_token = common::token_for(&f.bob);
    let comments_uri = format!("/api/videos/{}/comments", f.video_id);

    // Alice creates a comment.
    let (status, body) = common::send(
        &f.app,
        common::json_request("POST", &comments_uri, Some(&alice_token), json!({"content": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["content"], "hello");
    assert_eq!(body["data"]["owner_id"], json!(f.alice.id));
    assert_eq!(body["message"], "comment added successfully");
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();
    let comment_uri = format!("/api/comments/{comment_id}");

    // Alice edits it.
    let (status, body) = common::send(
        &f.app,
        common::json_request("PATCH", &comment_uri, Some(&alice_token), json!({"content": "hello edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "hello edited");

    // Bob cannot edit Alice's comment, and the content stays put.
    let (status, body) = common::send(
        &f.app,
        common::json_request("PATCH", &comment_uri, Some(&bob_token), json!({"content": "bob was here"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(body["message"], "only comment owner can edit their comment");

    let stored = f.store.find_comment(comment_id.parse()?).await?.unwrap();
    assert_eq!(stored.content, "hello edited");

    // Bob cannot delete it either.
    let (status, _) = common::send(
        &f.app,
        common::json_request("DELETE", &comment_uri, Some(&bob_token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Alice deletes it; the listing no longer includes it.
    let (status, body) = common::send(
        &f.app,
        common::json_request("DELETE", &comment_uri, Some(&alice_token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "comment deleted successfully");

    let (status, body) = common::send(&f.app, common::get(&comments_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 0);

    // Further mutation of the deleted comment is NotFound, terminally.
    let (status, _) = common::send(
        &f.app,
        common::json_request("PATCH", &comment_uri, Some(&alice_token), json!({"content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn create_requires_authentication() -> Result<()> {
    let f = fixture().await;
    let uri = format!("/api/videos/{}/comments", f.video_id);
    let (status, body) =
        common::send(&f.app, common::json_request("POST", &uri, None, json!({"content": "hi"}))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized request");
    assert_eq!(f.store.comment_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn create_against_missing_video_is_not_found() -> Result<()> {
    let f = fixture().await;
    let token = common::token_for(&f.alice);
    let uri = format!("/api/videos/{}/comments", Uuid::new_v4());
    let (status, body) =
        common::send(&f.app, common::json_request("POST", &uri, Some(&token), json!({"content": "hi"}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "video not found");
    Ok(())
}

#[tokio::test]
async fn empty_or_missing_content_fails_before_any_write() -> Result<()> {
    let f = fixture().await;
    let token = common::token_for(&f.alice);
    let uri = format!("/api/videos/{}/comments", f.video_id);

    for body in [json!({"content": ""}), json!({"content": "   "}), json!({})] {
        let (status, response) =
            common::send(&f.app, common::json_request("POST", &uri, Some(&token), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "content is required");
    }
    assert_eq!(f.store.comment_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn updating_a_missing_comment_is_not_found() -> Result<()> {
    let f = fixture().await;
    let token = common::token_for(&f.alice);
    let uri = format!("/api/comments/{}", Uuid::new_v4());
    let (status, _) = common::send(
        &f.app,
        common::json_request("PATCH", &uri, Some(&token), json!({"content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_ids_are_rejected_as_bad_requests() -> Result<()> {
    let f = fixture().await;
    let token = common::token_for(&f.alice);

    let (status, body) = common::send(&f.app, common::get("/api/videos/not-a-uuid/comments")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid video id");

    let (status, _) = common::send(
        &f.app,
        common::json_request("PATCH", "/api/comments/42", Some(&token), json!({"content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn list_view_joins_owner_and_likes_per_viewer() -> Result<()> {
    let f = fixture().await;
    let alice_token = common::token_for(&f.alice);
    let bob_token = common::token_for(&f.bob);
    let uri = format!("/api/videos/{}/comments", f.video_id);

    let (_, body) = common::send(
        &f.app,
        common::json_request("POST", &uri, Some(&alice_token), json!({"content": "hello"})),
    )
    .await;
    let comment_id: Uuid = body["data"]["id"].as_str().unwrap().parse()?;
    f.store.seed_like(Like::for_comment(comment_id, f.bob.id)).await;

    // Anonymous viewer: likes counted, is_liked always false.
    let (status, body) = common::send(&f.app, common::get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let item = &body["data"]["items"][0];
    assert_eq!(item["content"], "hello");
    assert_eq!(item["likes_count"], 1);
    assert_eq!(item["is_liked"], false);
    assert_eq!(item["owner"]["username"], "alice");
    assert_eq!(item["owner"]["full_name"], "alice Example");
    assert!(item["owner"].get("password_hash").is_none());
    assert!(item.get("video_id").is_none());

    // The liker sees is_liked = true, another viewer does not.
    let (_, body) = common::send(&f.app, common::get_auth(&uri, &bob_token)).await;
    assert_eq!(body["data"]["items"][0]["is_liked"], true);
    let (_, body) = common::send(&f.app, common::get_auth(&uri, &alice_token)).await;
    assert_eq!(body["data"]["items"][0]["is_liked"], false);
    Ok(())
}

#[tokio::test]
async fn listing_a_missing_video_is_not_found() -> Result<()> {
    let f = fixture().await;
    let uri = format!("/api/videos/{}/comments", Uuid::new_v4());
    let (status, body) = common::send(&f.app, common::get(&uri)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "video not found");
    Ok(())
}
