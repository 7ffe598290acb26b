use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{error, instrument, warn};

use super::services::run_ingest;
use crate::{error::ApiError, state::AppState};

pub fn scrape_routes() -> Router<AppState> {
    Router::new().route("/api/scrape/newsapi", get(scrape_newsapi))
}

/// Checks the bearer token when one is configured.
fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        Ok(())
    } else {
        warn!("ingestion trigger rejected: missing or wrong token");
        Err(ApiError::Unauthorized("Invalid scrape token.".into()))
    }
}

#[instrument(skip_all)]
pub async fn scrape_newsapi(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(state.config.scrape.token.as_deref(), &headers)?;

    match run_ingest(&state).await {
        Ok(report) => Ok(Json(json!({
            "success": true,
            "saved": report.saved,
            "skipped": report.skipped,
            "message": report.message(),
        }))
        .into_response()),
        Err(e) => {
            error!(error = %e, "ingestion failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response())
        }
    }
}
