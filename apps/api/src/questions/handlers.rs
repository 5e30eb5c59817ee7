use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Question, QuestionSummary, Role};
use crate::state::AppState;

/// GET /api/v1/industries/:industry/roles
pub async fn handle_roles_by_industry(
    State(state): State<AppState>,
    Path(industry): Path<String>,
) -> Result<Json<Vec<Role>>, AppError> {
    if industry.trim().is_empty() {
        return Err(AppError::Validation("industry cannot be empty".to_string()));
    }
    let roles = state.questions.get_roles_by_industry(&industry).await?;
    Ok(Json(roles))
}

/// GET /api/v1/roles/:role_id/questions
pub async fn handle_questions_by_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionSummary>>, AppError> {
    state.questions.find_role(role_id).await?;
    let questions = state.questions.get_questions_by_role(role_id).await?;
    Ok(Json(questions))
}

/// GET /api/v1/questions/:uuid
pub async fn handle_get_question(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Question>, AppError> {
    let question = state.questions.get_question(uuid).await?;
    Ok(Json(question))
}
