use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{IngestedPost, Post, PostDraft, PostPage, PostWithCategory, SitemapRow};
use crate::error::StoreError;

#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Published posts, newest `published_at` first, optionally in one category.
    async fn list_published(
        &self,
        category_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<PostPage, StoreError>;
    async fn find_published(&self, id: i64) -> Result<Option<PostWithCategory>, StoreError>;
    async fn sitemap_rows(&self) -> Result<Vec<SitemapRow>, StoreError>;

    /// Every post regardless of state, newest `created_at` first.
    async fn list_all(&self) -> Result<Vec<PostWithCategory>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<Post>, StoreError>;
    async fn create(&self, draft: &PostDraft) -> Result<Post, StoreError>;
    async fn update(&self, id: i64, draft: &PostDraft) -> Result<Option<Post>, StoreError>;
    async fn set_published(&self, id: i64, published: bool) -> Result<Option<Post>, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
    async fn any_in_category(&self, category_id: Uuid) -> Result<bool, StoreError>;

    async fn exists_by_title_and_date(
        &self,
        title: &str,
        published_at: OffsetDateTime,
    ) -> Result<bool, StoreError>;
    /// Returns `None` when (title, published_at) is already taken.
    async fn insert_ingested(&self, article: &IngestedPost) -> Result<Option<Post>, StoreError>;
}

#[derive(Clone)]
pub struct PgPostRepo {
    db: PgPool,
}

impl PgPostRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepo for PgPostRepo {
    async fn list_published(
        &self,
        category_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<PostPage, StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*)
              FROM news_posts
             WHERE published = TRUE
               AND ($1::uuid IS NULL OR category_id = $1)
            "#,
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;

        let posts = sqlx::query_as::<_, PostWithCategory>(
            r#"
            SELECT p.id, p.title, p.content, p.excerpt, p.category_id, p.published,
                   p.published_at, p.analysis, p.created_at, p.updated_at,
                   c.name AS category_name
              FROM news_posts p
              LEFT JOIN news_categories c ON c.id = p.category_id
             WHERE p.published = TRUE
               AND ($1::uuid IS NULL OR p.category_id = $1)
             ORDER BY p.published_at DESC NULLS LAST, p.id DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(PostPage { posts, total })
    }

    async fn find_published(&self, id: i64) -> Result<Option<PostWithCategory>, StoreError> {
        sqlx::query_as::<_, PostWithCategory>(
            r#"
            SELECT p.id, p.title, p.content, p.excerpt, p.category_id, p.published,
                   p.published_at, p.analysis, p.created_at, p.updated_at,
                   c.name AS category_name
              FROM news_posts p
              LEFT JOIN news_categories c ON c.id = p.category_id
             WHERE p.id = $1 AND p.published = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn sitemap_rows(&self) -> Result<Vec<SitemapRow>, StoreError> {
        sqlx::query_as::<_, SitemapRow>(
            r#"
            SELECT id, updated_at
              FROM news_posts
             WHERE published = TRUE
             ORDER BY published_at DESC NULLS LAST
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_all(&self) -> Result<Vec<PostWithCategory>, StoreError> {
        sqlx::query_as::<_, PostWithCategory>(
            r#"
            SELECT p.id, p.title, p.content, p.excerpt, p.category_id, p.published,
                   p.published_at, p.analysis, p.created_at, p.updated_at,
                   c.name AS category_name
              FROM news_posts p
              LEFT JOIN news_categories c ON c.id = p.category_id
             ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, StoreError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, excerpt, category_id, published,
                   published_at, analysis, created_at, updated_at
              FROM news_posts
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create(&self, draft: &PostDraft) -> Result<Post, StoreError> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO news_posts (title, content, excerpt, category_id, published, published_at)
            VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 THEN now() ELSE NULL END)
            RETURNING id, title, content, excerpt, category_id, published,
                      published_at, analysis, created_at, updated_at
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.excerpt)
        .bind(draft.category_id)
        .bind(draft.published)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn update(&self, id: i64, draft: &PostDraft) -> Result<Option<Post>, StoreError> {
        // An edit keeps the original publication time of an already published post.
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE news_posts
               SET title = $2,
                   content = $3,
                   excerpt = $4,
                   category_id = $5,
                   published = $6,
                   published_at = CASE WHEN $6 THEN COALESCE(published_at, now()) ELSE NULL END,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, title, content, excerpt, category_id, published,
                      published_at, analysis, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.excerpt)
        .bind(draft.category_id)
        .bind(draft.published)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<Option<Post>, StoreError> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE news_posts
               SET published = $2,
                   published_at = CASE WHEN $2 THEN now() ELSE NULL END,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, title, content, excerpt, category_id, published,
                      published_at, analysis, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(published)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM news_posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(res.rows_affected() > 0)
    }

    async fn any_in_category(&self, category_id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM news_posts WHERE category_id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn exists_by_title_and_date(
        &self,
        title: &str,
        published_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM news_posts WHERE title = $1 AND published_at = $2)",
        )
        .bind(title)
        .bind(published_at)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn insert_ingested(&self, article: &IngestedPost) -> Result<Option<Post>, StoreError> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO news_posts (title, content, excerpt, published, published_at, analysis)
            VALUES ($1, $2, $3, TRUE, $4, $5)
            ON CONFLICT ON CONSTRAINT news_posts_title_published_at_key DO NOTHING
            RETURNING id, title, content, excerpt, category_id, published,
                      published_at, analysis, created_at, updated_at
            "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(article.published_at)
        .bind(&article.analysis)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }
}
