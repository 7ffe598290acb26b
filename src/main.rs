use std::time::Duration;

mod app;
mod auth;
mod categories;
mod config;
mod db;
mod error;
mod extract;
mod feed;
mod posts;
mod scrape;
mod state;
#[cfg(test)]
mod testing;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "newsroom=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    if let Some(admin) = &app_state.config.admin {
        auth::services::ensure_admin(app_state.admins.as_ref(), &admin.username, &admin.password)
            .await?;
    }

    if let Some(minutes) = app_state.config.scrape.interval_minutes {
        scrape::scheduler::spawn(app_state.clone(), Duration::from_secs(minutes * 60));
    }

    app::serve(app::build_app(app_state)).await
}
