pub mod gemini;
pub mod handlers;
pub mod newsapi;
pub mod scheduler;
pub mod services;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::scrape_routes()
}
