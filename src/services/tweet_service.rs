use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::aggregate::{
    Collection, ComputedField, Expr, Page, PageRequest, Pipeline, SortDirection,
};
use crate::models::{Identity, NewTweet, Tweet, TweetView};
use crate::store::{Datastore, StoreError};

use super::{ownership, require_content, ServiceError};

/// Tweets follow the same owner-gated pipeline as comments, over a second
/// collection and without a parent resource on create.
pub struct TweetService {
    store: Arc<dyn Datastore>,
}

impl TweetService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, actor: &Identity, content: &str) -> Result<Tweet, ServiceError> {
        let content = require_content(content)?;
        self.store
            .create_tweet(NewTweet { content, owner_id: actor.id })
            .await?
            .ok_or_else(|| {
                ServiceError::WriteFailed("failed to create tweet, please try again".to_string())
            })
    }

    /// A user's tweets, newest first, with the same viewer-relative like
    /// fields as the comment view.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        viewer: Option<&Identity>,
        page: PageRequest,
    ) -> Result<Page<TweetView>, ServiceError> {
        self.store
            .find_identity(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("user not found".to_string()))?;

        let viewer_id = viewer.map(|v| json!(v.id)).unwrap_or(Value::Null);
        let pipeline = Pipeline::new(Collection::Tweets)
            .match_field("owner_id", json!(user_id))
            .lookup(Collection::Users, "owner_id", "id", "owner_docs")
            .lookup(Collection::Likes, "id", "tweet_id", "likes")
            .add_fields(vec![
                ComputedField::new("likes_count", Expr::Size("likes".into())),
                ComputedField::new("owner", Expr::First("owner_docs".into())),
                ComputedField::new(
                    "is_liked",
                    Expr::In { needle: viewer_id, path: "likes.liked_by".into() },
                ),
            ])
            .sort("created_at", SortDirection::Desc)
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
        Ok(documents.decode::<TweetView>().map_err(StoreError::from)?)
    }

    pub async fn edit(
        &self,
        tweet_id: Uuid,
        actor: &Identity,
        content: &str,
    ) -> Result<Tweet, ServiceError> {
        let content = require_content(content)?;

        let existing = self
            .store
            .find_tweet(tweet_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("tweet not found".to_string()))?;
        ownership::ensure_owner(actor, existing.owner_id, "tweet", "edit")?;

        self.store
            .update_tweet(tweet_id, &content)
            .await?
            .ok_or_else(|| {
                ServiceError::WriteFailed("failed to edit tweet, please try again".to_string())
            })
    }

    pub async fn remove(&self, tweet_id: Uuid, actor: &Identity) -> Result<(), ServiceError> {
        let existing = self
            .store
            .find_tweet(tweet_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("tweet not found".to_string()))?;
        ownership::ensure_owner(actor, existing.owner_id, "tweet", "delete")?;

        self.store.delete_tweet(tweet_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Like};
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    fn account(username: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            full_name: format!("{username} Example"),
            avatar_url: None,
            password_hash: "x".to_string(),
            refresh_token: None,
            created_at: Utc::now(),
        }
    }

    async fn fixture() -> (Arc<MemoryStore>, TweetService, Identity, Identity) {
        let store = Arc::new(MemoryStore::new());
        let alice = account("alice");
        let bob = account("bob");
        let alice_id = Identity::from(&alice);
        let bob_id = Identity::from(&bob);
        store.seed_account(alice).await;
        store.seed_account(bob).await;
        let service = TweetService::new(store.clone());
        (store, service, alice_id, bob_id)
    }

    #[tokio::test]
    async fn create_rejects_blank_content() {
        let (_, service, alice, _) = fixture().await;
        assert!(matches!(
            service.create(&alice, " ").await.unwrap_err(),
            ServiceError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn only_owner_can_mutate() {
        let (store, service, alice, bob) = fixture().await;
        let tweet = service.create(&alice, "first!").await.unwrap();

        assert!(matches!(
            service.edit(tweet.id, &bob, "stolen").await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert!(matches!(
            service.remove(tweet.id, &bob).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let stored = store.find_tweet(tweet.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "first!");

        service.remove(tweet.id, &alice).await.unwrap();
        assert!(store.find_tweet(tweet.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_with_like_fields() {
        let (store, service, alice, bob) = fixture().await;
        let older = service.create(&alice, "older").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = service.create(&alice, "newer").await.unwrap();
        store.seed_like(Like::for_tweet(older.id, bob.id)).await;

        let page = service
            .list_for_user(alice.id, Some(&bob), PageRequest { page: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.items[0].id, newer.id);
        assert_eq!(page.items[1].id, older.id);
        assert_eq!(page.items[1].likes_count, 1);
        assert!(page.items[1].is_liked);
        assert!(!page.items[0].is_liked);
    }

    #[tokio::test]
    async fn listing_an_unknown_user_is_not_found() {
        let (_, service, _, _) = fixture().await;
        assert!(matches!(
            service
                .list_for_user(Uuid::new_v4(), None, PageRequest { page: 1, limit: 10 })
                .await
                .unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
