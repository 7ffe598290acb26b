use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::Category;
use crate::error::StoreError;

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// All categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>, StoreError>;
    async fn find(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn create(&self, name: &str, description: Option<&str>) -> Result<Category, StoreError>;
    /// Returns `None` when no row has `id`.
    async fn update(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, StoreError>;
    /// Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgCategoryRepo {
    db: PgPool,
}

impl PgCategoryRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM news_categories
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM news_categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create(&self, name: &str, description: Option<&str>) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO news_categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn update(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE news_categories
               SET name = $2, description = $3, updated_at = now()
             WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM news_categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(res.rows_affected() > 0)
    }
}
