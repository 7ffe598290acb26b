use axum::{
    extract::{Query, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::{
    dto::{ListQuery, PostDetail, PostListResponse, PostRequest, PublishRequest},
    repo_types::{Post, PostWithCategory},
    services,
};
use crate::{
    auth::AdminSession,
    error::ApiError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

// --- routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/:id", get(get_post))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/posts", get(admin_list_posts).post(create_post))
        .route(
            "/api/admin/posts/:id",
            get(admin_get_post).put(update_post).delete(delete_post),
        )
        .route("/api/admin/posts/:id/publish", put(publish_post))
}

// --- public ---

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let params = services::parse_list_query(&q)?;
    let page = state
        .posts
        .list_published(params.category_id, params.limit, params.offset())
        .await
        .map_err(|e| ApiError::internal("Failed to load posts.", e))?;
    Ok(Json(PostListResponse {
        pagination: services::pagination(params.page, params.limit, page.total),
        posts: page.posts,
    }))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    let post = state
        .posts
        .find_published(id)
        .await
        .map_err(|e| ApiError::internal("Failed to load post.", e))?
        .ok_or_else(|| ApiError::NotFound("Post not found.".into()))?;
    let meta = services::post_meta(&state.config.site, &post);
    Ok(Json(PostDetail { post, meta }))
}

// --- admin ---

#[instrument(skip(state, _session))]
pub async fn admin_list_posts(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<PostWithCategory>>, ApiError> {
    let posts = state
        .posts
        .list_all()
        .await
        .map_err(|e| ApiError::internal("Failed to load posts.", e))?;
    Ok(Json(posts))
}

#[instrument(skip(state, _session))]
pub async fn admin_get_post(
    State(state): State<AppState>,
    _session: AdminSession,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .posts
        .find(id)
        .await
        .map_err(|e| ApiError::internal("Failed to load post.", e))?
        .ok_or_else(|| ApiError::NotFound("Post not found.".into()))?;
    Ok(Json(post))
}

#[instrument(skip(state, body), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn create_post(
    State(state): State<AppState>,
    session: AdminSession,
    ApiJson(body): ApiJson<PostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = services::create_post(state.posts.as_ref(), state.categories.as_ref(), body).await?;
    Ok(Json(post))
}

#[instrument(skip(state, body), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn update_post(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<PostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post =
        services::update_post(state.posts.as_ref(), state.categories.as_ref(), id, body).await?;
    Ok(Json(post))
}

#[instrument(skip(state), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn publish_post(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<PublishRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = services::set_published(state.posts.as_ref(), id, body.published).await?;
    Ok(Json(post))
}

#[instrument(skip(state), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn delete_post(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    services::delete_post(state.posts.as_ref(), id).await?;
    Ok(Json(json!({ "success": true })))
}
