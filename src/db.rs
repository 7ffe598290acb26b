use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    run_migrations(&pool).await;
    Ok(pool)
}

/// Applies `migrations/`; a failure is logged and startup continues.
pub async fn run_migrations(pool: &PgPool) -> bool {
    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            tracing::info!("database migrations applied");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "migration failed; continuing");
            false
        }
    }
}
