//! Axum route handlers for the Session Authority API.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::InterviewSession;
use crate::sessions::authority::{
    AbandonAck, CompletionArtifact, StartSessionRequest, StartSessionResponse, SubmitOutcome,
    SubmitResponseRequest,
};
use crate::sessions::export::{render_session, ExportFormat};
use crate::sessions::summary::{compute_session_summary, SessionSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// POST /api/v1/interview-sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>), AppError> {
    if request.industry.trim().is_empty() {
        return Err(AppError::Validation("industry cannot be empty".to_string()));
    }
    let started = state.authority.start(request).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// GET /api/v1/interview-sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewSession>, AppError> {
    Ok(Json(state.authority.get(id).await?))
}

/// POST /api/v1/interview-sessions/:id/responses
///
/// Returns either `{"next_question": {...}}` or `{"completed": true}`.
pub async fn handle_submit_response(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitResponseRequest>,
) -> Result<Json<SubmitOutcome>, AppError> {
    Ok(Json(state.authority.submit_response(id, request).await?))
}

/// POST /api/v1/interview-sessions/:id/complete
pub async fn handle_complete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletionArtifact>, AppError> {
    Ok(Json(state.authority.complete(id).await?))
}

/// POST /api/v1/interview-sessions/:id/abandon
pub async fn handle_abandon_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AbandonAck>, AppError> {
    Ok(Json(state.authority.abandon(id).await?))
}

/// GET /api/v1/interview-sessions/:id/summary
pub async fn handle_session_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = state.authority.get(id).await?;
    Ok(Json(compute_session_summary(&session)))
}

/// GET /api/v1/interview-sessions/:id/export?format=text|html
pub async fn handle_export_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let session = state.authority.get(id).await?;
    let body = render_session(&session, query.format)?;
    let disposition = format!(
        "attachment; filename=\"interview-{id}.{}\"",
        query.format.file_extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, query.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
