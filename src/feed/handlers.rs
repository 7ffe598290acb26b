use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    rss::{render_rss, FEED_ITEMS},
    sitemap::{render_robots, render_sitemap},
};
use crate::{error::ApiError, state::AppState};

const XML_CACHE: &str = "public, max-age=3600, s-maxage=3600";

pub fn feed_routes() -> Router<AppState> {
    Router::new()
        .route("/feed.xml", get(feed_xml))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/robots.txt", get(robots_txt))
}

#[instrument(skip_all)]
pub async fn feed_xml(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .posts
        .list_published(None, FEED_ITEMS, 0)
        .await
        .map_err(|e| ApiError::internal("Failed to build feed.", e))?;
    let xml = render_rss(&state.config.site, &page.posts, OffsetDateTime::now_utc())
        .map_err(|e| ApiError::internal("Failed to build feed.", e))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CACHE_CONTROL, XML_CACHE),
        ],
        xml,
    ))
}

#[instrument(skip_all)]
pub async fn sitemap_xml(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .posts
        .sitemap_rows()
        .await
        .map_err(|e| ApiError::internal("Failed to build sitemap.", e))?;
    let categories = state
        .categories
        .list()
        .await
        .map_err(|e| ApiError::internal("Failed to build sitemap.", e))?;
    let xml = render_sitemap(&state.config.site, &posts, &categories, OffsetDateTime::now_utc())
        .map_err(|e| ApiError::internal("Failed to build sitemap.", e))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CACHE_CONTROL, XML_CACHE),
        ],
        xml,
    ))
}

pub async fn robots_txt(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_robots(&state.config.site),
    )
}
