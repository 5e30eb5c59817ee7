use tracing::info;

use crate::errors::AppError;
use crate::models::session::NewSession;
use crate::questions::QuestionBank;
use crate::sessions::authority::StartSessionRequest;

/// Sequence length when the request does not set `question_limit`.
pub const DEFAULT_QUESTION_LIMIT: usize = 10;

/// Resolves a start request into the immutable parts of a new session.
///
/// The question sequence is the role's eligible questions in bank order,
/// truncated to the limit.
pub async fn plan_session(
    bank: &dyn QuestionBank,
    request: &StartSessionRequest,
) -> Result<NewSession, AppError> {
    let categories = request.categories.categories();
    if categories.is_empty() {
        return Err(AppError::Validation(
            "Select at least one question category".to_string(),
        ));
    }

    let role = bank.find_role(request.role_id).await?;
    if !role.industry.eq_ignore_ascii_case(request.industry.trim()) {
        return Err(AppError::Validation(format!(
            "Role '{}' does not belong to industry '{}'",
            role.name, request.industry
        )));
    }

    let limit = request
        .question_limit
        .unwrap_or(DEFAULT_QUESTION_LIMIT)
        .max(1);

    let question_sequence: Vec<_> = bank
        .eligible_questions(role.id, request.difficulty, &categories)
        .await?
        .into_iter()
        .take(limit)
        .map(|q| q.uuid)
        .collect();

    if question_sequence.is_empty() {
        return Err(AppError::UnprocessableEntity(format!(
            "No {} questions available for role '{}' in the selected categories",
            request.difficulty, role.name
        )));
    }

    let scenario_name = request
        .scenario_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} mock interview ({})", role.name, request.difficulty));

    let estimated_duration_minutes =
        question_sequence.len() as u32 * request.difficulty.minutes_per_question();

    info!(
        "Planned session for role {}: {} questions, ~{} min",
        role.id,
        question_sequence.len(),
        estimated_duration_minutes
    );

    Ok(NewSession {
        role_id: role.id,
        industry: role.industry,
        scenario_name,
        difficulty_level: request.difficulty,
        estimated_duration_minutes,
        question_sequence,
    })
}
