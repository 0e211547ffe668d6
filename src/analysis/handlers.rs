use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{instrument, warn};

use super::dto::{AnalysisSnapshot, ConfirmRequest, ManualSelection, QuickLogRequest, ReferenceQuery};
use super::provider::{is_supported_mime, ImageInput};
use crate::{
    errors::{api_error, ApiError},
    nutrition::{
        catalog::{search_references, ManualReference, QuickPreset, QUICK_PRESETS},
        AnalysisEstimate, FoodLogEntry,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/references", get(list_references))
        .route("/presets", get(list_presets))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis", post(submit_image).get(get_snapshot).delete(reset))
        .route("/analysis/manual", post(submit_manual))
        .route("/analysis/preset", post(submit_preset))
        .route("/analysis/confirm", post(confirm))
        .route("/quick-log", post(quick_log))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /analysis, raw image body with its Content-Type.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn submit_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnalysisEstimate>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if body.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_IMAGE", "image body is empty"));
    }
    if !is_supported_mime(&content_type) {
        return Err(api_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_MEDIA_TYPE",
            format!("unsupported image type '{content_type}'"),
        ));
    }

    let estimate = state
        .orchestrator
        .submit(ImageInput::new(body, content_type))
        .await?;
    Ok(Json(estimate))
}

#[instrument(skip(state))]
pub async fn get_snapshot(State(state): State<AppState>) -> Json<AnalysisSnapshot> {
    Json(state.orchestrator.snapshot())
}

#[instrument(skip(state))]
pub async fn reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.orchestrator.reset()?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn submit_manual(
    State(state): State<AppState>,
    Json(selection): Json<ManualSelection>,
) -> Result<Json<AnalysisEstimate>, ApiError> {
    Ok(Json(state.orchestrator.submit_manual(&selection)?))
}

/// Stages a preset as the current estimate; it still needs a confirm.
#[instrument(skip(state))]
pub async fn submit_preset(
    State(state): State<AppState>,
    Json(req): Json<QuickLogRequest>,
) -> Result<Json<AnalysisEstimate>, ApiError> {
    Ok(Json(state.orchestrator.submit_preset(&req.preset)?))
}

/// An empty body confirms with the estimate's own method; anything else must parse.
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn confirm(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<FoodLogEntry>), ApiError> {
    let req = parse_confirm(&body)?;
    let entry = state.orchestrator.confirm(req.method).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

fn parse_confirm(body: &[u8]) -> Result<ConfirmRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ConfirmRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "confirm body rejected");
        api_error(StatusCode::BAD_REQUEST, "INVALID_BODY", format!("invalid confirm body: {e}"))
    })
}

/// The tap is the confirmation: the entry is written without touching a pending scan.
#[instrument(skip(state))]
pub async fn quick_log(
    State(state): State<AppState>,
    Json(req): Json<QuickLogRequest>,
) -> Result<(StatusCode, Json<FoodLogEntry>), ApiError> {
    let entry = state.orchestrator.quick_log(&req.preset).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_references(Query(q): Query<ReferenceQuery>) -> Json<Vec<ManualReference>> {
    Json(search_references(&q.q).into_iter().copied().collect())
}

pub async fn list_presets() -> Json<&'static [QuickPreset]> {
    Json(QUICK_PRESETS)
}
