pub mod handlers;
pub mod rss;
pub mod sitemap;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::feed_routes()
}
