use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, StatusResponse},
        services::verify_admin,
        session::SessionKeys,
    },
    error::ApiError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", get(logout))
        .route("/api/auth/status", get(status))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Please enter a username and password.".into(),
        ));
    }

    let admin = verify_admin(state.admins.as_ref(), username, &payload.password)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password.".into()))?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys
        .sign(admin.id, &admin.username)
        .map_err(|e| ApiError::internal("Login failed.", e))?;
    let cookie = keys.session_cookie(token);

    info!(admin_id = %admin.id, username = %admin.username, "admin logged in");
    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse {
            success: true,
            username: admin.username,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let keys = SessionKeys::from_ref(&state);
    (
        [(header::SET_COOKIE, keys.removal_cookie().to_string())],
        Redirect::to("/admin/login"),
    )
}

#[instrument(skip_all)]
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<StatusResponse> {
    let keys = SessionKeys::from_ref(&state);
    Json(StatusResponse {
        is_logged_in: keys.claims_from_headers(&headers).is_some(),
    })
}
