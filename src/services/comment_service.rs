use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::aggregate::{
    Collection, ComputedField, Expr, Page, PageRequest, Pipeline, SortDirection,
};
use crate::models::{Comment, CommentView, Identity, NewComment};
use crate::store::{Datastore, StoreError};

use super::{ownership, require_content, ServiceError};

/// Comment read and mutation pipeline. Every operation takes the acting
/// identity explicitly; nothing is read from ambient request state.
pub struct CommentService {
    store: Arc<dyn Datastore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Denormalized, paginated comment listing for one video. The video
    /// existence check runs first so an invalid target short-circuits
    /// before the join is built.
    pub async fn list_for_video(
        &self,
        video_id: Uuid,
        viewer: Option<&Identity>,
        page: PageRequest,
    ) -> Result<Page<CommentView>, ServiceError> {
        self.store
            .find_video(video_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("video not found".to_string()))?;

        let viewer_id = viewer.map(|v| json!(v.id)).unwrap_or(Value::Null);
        let pipeline = Pipeline::new(Collection::Comments)
            .match_field("video_id", json!(video_id))
            .lookup(Collection::Users, "owner_id", "id", "owner_docs")
            .lookup(Collection::Likes, "id", "comment_id", "likes")
            .add_fields(vec![
                ComputedField::new("likes_count", Expr::Size("likes".into())),
                ComputedField::new("owner", Expr::First("owner_docs".into())),
                ComputedField::new(
                    "is_liked",
                    Expr::In { needle: viewer_id, path: "likes.liked_by".into() },
                ),
            ])
            .sort("created_at", SortDirection::Asc)
            .project(&[
                "id",
                "content",
                "created_at",
                "likes_count",
                "owner.username",
                "owner.full_name",
                "owner.avatar_url",
                "is_liked",
            ]);

        let documents = self.store.aggregate(&pipeline, &page).await?;
        Ok(documents.decode::<CommentView>().map_err(StoreError::from)?)
    }

    pub async fn add(
        &self,
        video_id: Uuid,
        actor: &Identity,
        content: &str,
    ) -> Result<Comment, ServiceError> {
        let content = require_content(content)?;

        self.store
            .find_video(video_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("video not found".to_string()))?;

        self.store
            .create_comment(NewComment { content, video_id, owner_id: actor.id })
            .await?
            .ok_or_else(|| {
                ServiceError::WriteFailed("failed to add comment, please try again".to_string())
            })
    }

    pub async fn edit(
        &self,
        comment_id: Uuid,
        actor: &Identity,
        content: &str,
    ) -> Result<Comment, ServiceError> {
        let content = require_content(content)?;

        let existing = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("comment not found".to_string()))?;
        ownership::ensure_owner(actor, existing.owner_id, "comment", "edit")?;

        self.store
            .update_comment(comment_id, &content)
            .await?
            .ok_or_else(|| {
                ServiceError::WriteFailed("failed to edit comment, please try again".to_string())
            })
    }

    pub async fn remove(&self, comment_id: Uuid, actor: &Identity) -> Result<(), ServiceError> {
        let existing = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("comment not found".to_string()))?;
        ownership::ensure_owner(actor, existing.owner_id, "comment", "delete")?;

        self.store.delete_comment(comment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Like, Video};
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    fn account(username: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            full_name: format!("{username} Example"),
            avatar_url: Some(format!("https://cdn.example/{username}.png")),
            password_hash: "x".to_string(),
            refresh_token: None,
            created_at: Utc::now(),
        }
    }

    fn video(owner_id: Uuid) -> Video {
        Video {
            id: Uuid::new_v4(),
            owner_id,
            title: "clip".to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    async fn fixture() -> (Arc<MemoryStore>, CommentService, Identity, Identity, Video) {
        let store = Arc::new(MemoryStore::new());
        let alice = account("alice");
        let bob = account("bob");
        let video = video(alice.id);
        let alice_id = Identity::from(&alice);
        let bob_id = Identity::from(&bob);
        store.seed_account(alice).await;
        store.seed_account(bob).await;
        store.seed_video(video.clone()).await;
        let service = CommentService::new(store.clone());
        (store, service, alice_id, bob_id, video)
    }

    #[tokio::test]
    async fn add_requires_existing_video() {
        let (_, service, alice, _, _) = fixture().await;
        let err = service.add(Uuid::new_v4(), &alice, "hello").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_content_fails_before_any_write() {
        let (store, service, alice, _, video) = fixture().await;
        let err = service.add(video.id, &alice, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(store.comment_count().await, 0);
    }

    #[tokio::test]
    async fn non_owner_cannot_edit_and_content_is_unchanged() {
        let (store, service, alice, bob, video) = fixture().await;
        let comment = service.add(video.id, &alice, "hello").await.unwrap();

        let err = service.edit(comment.id, &bob, "hijacked").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let stored = store.find_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "hello");
    }

    #[tokio::test]
    async fn owner_update_is_a_full_replacement() {
        let (store, service, alice, _, video) = fixture().await;
        let comment = service.add(video.id, &alice, "hello").await.unwrap();

        let updated = service.edit(comment.id, &alice, "hello edited").await.unwrap();
        assert_eq!(updated.content, "hello edited");
        assert_eq!(updated.owner_id, alice.id);

        // Repeating the same update keeps exactly one copy of the content.
        service.edit(comment.id, &alice, "hello edited").await.unwrap();
        let stored = store.find_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "hello edited");
    }

    #[tokio::test]
    async fn mutating_a_deleted_comment_is_not_found() {
        let (_, service, alice, _, video) = fixture().await;
        let comment = service.add(video.id, &alice, "hello").await.unwrap();
        service.remove(comment.id, &alice).await.unwrap();

        assert!(matches!(
            service.edit(comment.id, &alice, "again").await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            service.remove(comment.id, &alice).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    // The ownership check and the final write are separate store calls, so
    // two owner updates may interleave with last-write-wins. Accepted
    // behavior, documented here rather than closed.
    #[tokio::test]
    async fn concurrent_owner_updates_are_last_write_wins() {
        let (store, service, alice, _, video) = fixture().await;
        let comment = service.add(video.id, &alice, "v0").await.unwrap();

        service.edit(comment.id, &alice, "v1").await.unwrap();
        service.edit(comment.id, &alice, "v2").await.unwrap();

        let stored = store.find_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "v2");
    }

    #[tokio::test]
    async fn list_joins_owner_and_likes() {
        let (store, service, alice, bob, video) = fixture().await;
        let comment = service.add(video.id, &alice, "hello").await.unwrap();
        store.seed_like(Like::for_comment(comment.id, bob.id)).await;

        let page = service
            .list_for_video(video.id, Some(&bob), PageRequest { page: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        let view = &page.items[0];
        assert_eq!(view.content, "hello");
        assert_eq!(view.likes_count, 1);
        assert_eq!(view.owner.username, "alice");
        assert!(view.is_liked);

        // Anonymous viewers never see is_liked set.
        let anon = service
            .list_for_video(video.id, None, PageRequest { page: 1, limit: 10 })
            .await
            .unwrap();
        assert!(!anon.items[0].is_liked);
    }

    #[tokio::test]
    async fn list_for_missing_video_is_not_found() {
        let (_, service, _, _, _) = fixture().await;
        let err = service
            .list_for_video(Uuid::new_v4(), None, PageRequest { page: 1, limit: 10 })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_of_commentless_video_is_an_empty_page() {
        let (_, service, _, _, video) = fixture().await;
        let page = service
            .list_for_video(video.id, None, PageRequest { page: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.total_items, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
