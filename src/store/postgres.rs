// Postgres datastore. Single-statement CRUD with RETURNING so every
// mutation is one atomic round trip; aggregation runs the compiled
// pipeline query and reads each row back as a JSON document.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::aggregate::sql::{self, SqlParam};
use crate::aggregate::{Page, PageRequest, Pipeline};
use crate::models::{Comment, Identity, NewComment, NewTweet, Tweet, Video};

use super::{Datastore, StoreError};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::info!("connected to postgres");
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Uuid(u) => query.bind(*u),
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Int(i) => query.bind(*i),
            SqlParam::Bool(b) => query.bind(*b),
        };
    }
    query
}

#[async_trait]
impl Datastore for PostgresStore {
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let identity = sqlx::query_as::<_, Identity>(
            "SELECT id, username, full_name, avatar_url FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn find_video(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        let video = sqlx::query_as::<_, Video>(
            "SELECT id, owner_id, title, description, created_at FROM videos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, content, video_id, owner_id, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(&self, new: NewComment) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, content, video_id, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING id, content, video_id, owner_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&new.content)
        .bind(new.video_id)
        .bind(new.owner_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, content, video_id, owner_id, created_at, updated_at",
        )
        .bind(id)
        .bind(content)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let comment = sqlx::query_as::<_, Comment>(
            "DELETE FROM comments WHERE id = $1 \
             RETURNING id, content, video_id, owner_id, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn find_tweet(&self, id: Uuid) -> Result<Option<Tweet>, StoreError> {
        let tweet = sqlx::query_as::<_, Tweet>(
            "SELECT id, content, owner_id, created_at, updated_at FROM tweets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tweet)
    }

    async fn create_tweet(&self, new: NewTweet) -> Result<Option<Tweet>, StoreError> {
        let tweet = sqlx::query_as::<_, Tweet>(
            "INSERT INTO tweets (id, content, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             RETURNING id, content, owner_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&new.content)
        .bind(new.owner_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(tweet)
    }

    async fn update_tweet(&self, id: Uuid, content: &str) -> Result<Option<Tweet>, StoreError> {
        let tweet = sqlx::query_as::<_, Tweet>(
            "UPDATE tweets SET content = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, content, owner_id, created_at, updated_at",
        )
        .bind(id)
        .bind(content)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(tweet)
    }

    async fn delete_tweet(&self, id: Uuid) -> Result<Option<Tweet>, StoreError> {
        let tweet = sqlx::query_as::<_, Tweet>(
            "DELETE FROM tweets WHERE id = $1 \
             RETURNING id, content, owner_id, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tweet)
    }

    async fn aggregate(
        &self,
        pipeline: &Pipeline,
        page: &PageRequest,
    ) -> Result<Page<Value>, StoreError> {
        let select = sql::build_select(pipeline, page)?;
        let rows = bind_params(sqlx::query(&select.sql), &select.params)
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .iter()
            .map(|row| row.try_get::<Value, _>("doc"))
            .collect::<Result<Vec<_>, _>>()?;

        let count = sql::build_count(pipeline)?;
        let row = bind_params(sqlx::query(&count.sql), &count.params)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;

        Ok(Page::from_parts(items, total as u64, page))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
