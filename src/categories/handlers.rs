use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::{dto::CategoryRequest, repo_types::Category, services};
use crate::{
    auth::AdminSession,
    error::ApiError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/api/categories", get(list_categories))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/categories",
            get(admin_list_categories).post(create_category),
        )
        .route(
            "/api/admin/categories/:id",
            put(update_category).delete(delete_category),
        )
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state
        .categories
        .list()
        .await
        .map_err(|e| ApiError::internal("Failed to load categories.", e))?;
    Ok(Json(categories))
}

#[instrument(skip(state, _session))]
pub async fn admin_list_categories(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<Category>>, ApiError> {
    list_categories(State(state)).await
}

#[instrument(skip(state, body), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn create_category(
    State(state): State<AppState>,
    session: AdminSession,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = services::create_category(state.categories.as_ref(), body).await?;
    Ok(Json(category))
}

#[instrument(skip(state, body), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn update_category(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = services::update_category(state.categories.as_ref(), id, body).await?;
    Ok(Json(category))
}

#[instrument(skip(state), fields(admin = %session.username, admin_id = %session.admin_id))]
pub async fn delete_category(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
    services::delete_category(state.categories.as_ref(), state.posts.as_ref(), id).await?;
    Ok(Json(json!({ "success": true })))
}
