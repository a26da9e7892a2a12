//! Axum route handlers for the exploration session API.
//!
//! Thin adapters: parse path/body, call the band's engine, convert
//! `EngineError` into the error envelope via `AppError`. No session logic
//! lives here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::exploration::engine::{
    ConfirmationPayload, DynamicChoicesView, PlanView, PromptView, RecommendationView,
    SessionSummary, SubmitOutcome, SubmitPayload,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: Uuid,
    pub band: String,
    pub total_stages: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateRecommendationRequest {
    #[serde(default)]
    pub regenerate: bool,
}

/// POST /api/v1/:band/sessions
pub async fn handle_start(
    State(state): State<AppState>,
    Path(band): Path<String>,
) -> Result<(StatusCode, Json<StartResponse>), AppError> {
    let engine = state.engine(&band)?;
    let session_id = engine.start().await;
    Ok((
        StatusCode::CREATED,
        Json(StartResponse {
            session_id,
            band: engine.catalog().band().as_str().to_string(),
            total_stages: engine.catalog().total_stages(),
        }),
    ))
}

/// GET /api/v1/:band/sessions/:id/question
pub async fn handle_get_question(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
) -> Result<Json<PromptView>, AppError> {
    let engine = state.engine(&band)?;
    Ok(Json(engine.get_current_prompt(session_id).await?))
}

/// POST /api/v1/:band/sessions/:id/response
///
/// Accepts identity, choice, and confirmation payloads; the engine
/// dispatches on the current stage's kind.
pub async fn handle_submit_response(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
    Json(payload): Json<SubmitPayload>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let engine = state.engine(&band)?;
    Ok(Json(engine.submit_response(session_id, payload).await?))
}

/// POST /api/v1/:band/sessions/:id/confirm
///
/// Alias over `submit_response` at the recommendation stage, for callers
/// that keep the confirm loop on a dedicated endpoint.
pub async fn handle_confirm_or_modify(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
    Json(confirmation): Json<ConfirmationPayload>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let engine = state.engine(&band)?;
    let payload = SubmitPayload {
        confirmation: Some(confirmation),
        ..Default::default()
    };
    Ok(Json(engine.submit_response(session_id, payload).await?))
}

/// POST /api/v1/:band/sessions/:id/recommendation
pub async fn handle_generate_recommendation(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
    Json(request): Json<GenerateRecommendationRequest>,
) -> Result<Json<RecommendationView>, AppError> {
    let engine = state.engine(&band)?;
    Ok(Json(
        engine
            .generate_recommendation(session_id, request.regenerate)
            .await?,
    ))
}

/// POST /api/v1/:band/sessions/:id/choices/regenerate
pub async fn handle_regenerate_choices(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
) -> Result<Json<DynamicChoicesView>, AppError> {
    let engine = state.engine(&band)?;
    Ok(Json(engine.regenerate_dynamic_choices(session_id).await?))
}

/// POST /api/v1/:band/sessions/:id/plan
pub async fn handle_generate_plan(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
) -> Result<Json<PlanView>, AppError> {
    let engine = state.engine(&band)?;
    Ok(Json(engine.generate_plan(session_id).await?))
}

/// GET /api/v1/:band/sessions/:id/summary
pub async fn handle_get_summary(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
) -> Result<Json<SessionSummary>, AppError> {
    let engine = state.engine(&band)?;
    Ok(Json(engine.get_summary(session_id).await?))
}

/// DELETE /api/v1/:band/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path((band, session_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let engine = state.engine(&band)?;
    if engine.delete(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {session_id} not found")))
    }
}
