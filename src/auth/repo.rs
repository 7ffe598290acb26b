use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::Admin;
use crate::error::StoreError;

#[async_trait]
pub trait AdminRepo: Send + Sync {
    /// Find an admin by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError>;

    /// Create an admin, or replace the password hash of an existing one.
    async fn upsert(&self, username: &str, password_hash: &str) -> Result<Admin, StoreError>;
}

#[derive(Clone)]
pub struct PgAdminRepo {
    db: PgPool,
}

impl PgAdminRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminRepo for PgAdminRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM news_admins
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn upsert(&self, username: &str, password_hash: &str) -> Result<Admin, StoreError> {
        sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO news_admins (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username)
            DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = now()
            RETURNING id, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }
}
