//! Interview session aggregate.
//!
//! The authority owns the canonical record; every mutation goes through
//! `record_response`, `complete` or `abandon`, which enforce:
//!
//! - `0 <= current_question_index <= question_sequence.len()`
//! - `responses.len() == current_question_index`
//! - `responses[i].question_uuid == question_sequence[i]`
//! - terminal sessions (`completed`, `abandoned`) never change again

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Difficulty, Question, QuestionCategory};
use crate::sessions::validation::{validate_response, word_count};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(AppError::Internal(anyhow!(
                "Unknown session status '{other}'"
            ))),
        }
    }
}

/// One accepted answer. Question text and category are copied at submission
/// time so history stays stable if the bank is edited later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionResponse {
    pub question_uuid: Uuid,
    pub question_text: String,
    pub question_category: QuestionCategory,
    pub response_text: String,
    pub response_duration_seconds: u64,
    pub word_count: usize,
    pub submitted_at: DateTime<Utc>,
}

/// Pointer to a question within a session, 1-based for display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRef {
    pub uuid: Uuid,
    pub number: usize,
    pub total: usize,
}

impl QuestionRef {
    /// Zero-based cursor position this reference points at.
    pub fn index(&self) -> usize {
        self.number.saturating_sub(1)
    }
}

/// Everything fixed at creation time.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub role_id: Uuid,
    pub industry: String,
    pub scenario_name: String,
    pub difficulty_level: Difficulty,
    pub estimated_duration_minutes: u32,
    pub question_sequence: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewSession {
    id: Uuid,
    role_id: Uuid,
    industry: String,
    scenario_name: String,
    difficulty_level: Difficulty,
    estimated_duration_minutes: u32,
    question_sequence: Vec<Uuid>,
    current_question_index: usize,
    responses: Vec<QuestionResponse>,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    abandoned_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    /// Creates an in-progress session. The sequence must be non-empty.
    pub fn start(id: Uuid, new: NewSession, started_at: DateTime<Utc>) -> Result<Self, AppError> {
        if new.question_sequence.is_empty() {
            return Err(AppError::UnprocessableEntity(
                "A session needs at least one question".to_string(),
            ));
        }

        Ok(Self {
            id,
            role_id: new.role_id,
            industry: new.industry,
            scenario_name: new.scenario_name,
            difficulty_level: new.difficulty_level,
            estimated_duration_minutes: new.estimated_duration_minutes,
            question_sequence: new.question_sequence,
            current_question_index: 0,
            responses: Vec::new(),
            status: SessionStatus::InProgress,
            started_at,
            completed_at: None,
            abandoned_at: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role_id(&self) -> Uuid {
        self.role_id
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn difficulty_level(&self) -> Difficulty {
        self.difficulty_level
    }

    pub fn estimated_duration_minutes(&self) -> u32 {
        self.estimated_duration_minutes
    }

    pub fn question_sequence(&self) -> &[Uuid] {
        &self.question_sequence
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn responses(&self) -> &[QuestionResponse] {
        &self.responses
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn abandoned_at(&self) -> Option<DateTime<Utc>> {
        self.abandoned_at
    }

    pub fn total_questions(&self) -> usize {
        self.question_sequence.len()
    }

    /// True once every question in the sequence has a response.
    pub fn is_complete_eligible(&self) -> bool {
        self.current_question_index == self.question_sequence.len()
    }

    /// The question the cursor points at, if any remain.
    pub fn current_question(&self) -> Option<QuestionRef> {
        self.question_sequence
            .get(self.current_question_index)
            .map(|&uuid| QuestionRef {
                uuid,
                number: self.current_question_index + 1,
                total: self.question_sequence.len(),
            })
    }

    pub fn last_response(&self) -> Option<&QuestionResponse> {
        self.responses.last()
    }

    /// Appends a response for the question under the cursor and advances the
    /// cursor by exactly one. Returns the stored response.
    pub fn record_response(
        &mut self,
        question: &Question,
        response_text: &str,
        response_duration_seconds: u64,
        submitted_at: DateTime<Utc>,
    ) -> Result<&QuestionResponse, AppError> {
        let expected = self.expected_question()?;

        if question.uuid != expected.uuid {
            return Err(AppError::Conflict(format!(
                "Question {} is not the current question ({}) of session {}",
                question.uuid, expected.uuid, self.id
            )));
        }

        let validation = validate_response(response_text);
        if let Some(message) = validation.message {
            return Err(AppError::Validation(message));
        }

        self.responses.push(QuestionResponse {
            question_uuid: question.uuid,
            question_text: question.prompt.clone(),
            question_category: question.category,
            response_text: response_text.to_string(),
            response_duration_seconds,
            word_count: word_count(response_text),
            submitted_at,
        });
        self.current_question_index += 1;

        Ok(&self.responses[self.responses.len() - 1])
    }

    /// Finalizes a fully answered session. Returns `false` when it was
    /// already completed.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<bool, AppError> {
        match self.status {
            SessionStatus::Completed => Ok(false),
            SessionStatus::Abandoned => Err(AppError::Conflict(format!(
                "Session {} was abandoned and cannot be completed",
                self.id
            ))),
            SessionStatus::InProgress if !self.is_complete_eligible() => {
                Err(AppError::Conflict(format!(
                    "Session {} still has {} unanswered question(s)",
                    self.id,
                    self.question_sequence.len() - self.current_question_index
                )))
            }
            SessionStatus::InProgress => {
                self.status = SessionStatus::Completed;
                self.completed_at = Some(at);
                Ok(true)
            }
        }
    }

    /// Hard cancel. Already-recorded responses are kept. Returns `false` when
    /// it was already abandoned.
    pub fn abandon(&mut self, at: DateTime<Utc>) -> Result<bool, AppError> {
        match self.status {
            SessionStatus::Abandoned => Ok(false),
            SessionStatus::Completed => Err(AppError::Conflict(format!(
                "Session {} is already completed",
                self.id
            ))),
            SessionStatus::InProgress => {
                self.status = SessionStatus::Abandoned;
                self.abandoned_at = Some(at);
                Ok(true)
            }
        }
    }

    /// The question a submission must answer right now, or `Conflict` when
    /// the session is terminal or its sequence is exhausted.
    pub fn expected_question(&self) -> Result<QuestionRef, AppError> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Cannot submit a response to session {}: it is {}",
                self.id, self.status
            )));
        }
        self.current_question().ok_or_else(|| {
            AppError::Conflict(format!(
                "Session {} has no unanswered questions left",
                self.id
            ))
        })
    }

    /// Rebuilds the aggregate from storage, rejecting rows that break the
    /// cursor/response invariants.
    pub fn from_rows(row: SessionRow, response_rows: Vec<ResponseRow>) -> Result<Self, AppError> {
        let responses = response_rows
            .into_iter()
            .map(QuestionResponse::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let current_question_index = usize::try_from(row.current_question_index)
            .map_err(|_| AppError::Internal(anyhow!("Negative cursor on session {}", row.id)))?;

        let consistent = current_question_index <= row.question_sequence.len()
            && responses.len() == current_question_index
            && responses
                .iter()
                .zip(&row.question_sequence)
                .all(|(response, uuid)| response.question_uuid == *uuid);
        if !consistent {
            return Err(AppError::Internal(anyhow!(
                "Stored session {} violates cursor/response invariants",
                row.id
            )));
        }

        Ok(Self {
            id: row.id,
            role_id: row.role_id,
            industry: row.industry,
            scenario_name: row.scenario_name,
            difficulty_level: row.difficulty_level.parse()?,
            estimated_duration_minutes: u32::try_from(row.estimated_duration_minutes).map_err(
                |_| {
                    AppError::Internal(anyhow!(
                        "Stored session {} has negative estimated duration {}",
                        row.id,
                        row.estimated_duration_minutes
                    ))
                },
            )?,
            question_sequence: row.question_sequence,
            current_question_index,
            responses,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            abandoned_at: row.abandoned_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub industry: String,
    pub scenario_name: String,
    pub difficulty_level: String,
    pub estimated_duration_minutes: i32,
    pub question_sequence: Vec<Uuid>,
    pub current_question_index: i32,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub abandoned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResponseRow {
    pub session_id: Uuid,
    pub position: i32,
    pub question_uuid: Uuid,
    pub question_text: String,
    pub question_category: String,
    pub response_text: String,
    pub response_duration_seconds: i64,
    pub word_count: i32,
    pub submitted_at: DateTime<Utc>,
}

impl TryFrom<ResponseRow> for QuestionResponse {
    type Error = AppError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, value: i64| {
            AppError::Internal(anyhow!(
                "Stored response {} of session {} has out-of-range {field} {value}",
                row.position,
                row.session_id
            ))
        };
        let response_duration_seconds = u64::try_from(row.response_duration_seconds)
            .map_err(|_| corrupt("response_duration_seconds", row.response_duration_seconds))?;
        let word_count = usize::try_from(row.word_count)
            .map_err(|_| corrupt("word_count", i64::from(row.word_count)))?;

        Ok(QuestionResponse {
            question_uuid: row.question_uuid,
            question_text: row.question_text,
            question_category: row.question_category.parse()?,
            response_text: row.response_text,
            response_duration_seconds,
            word_count,
            submitted_at: row.submitted_at,
        })
    }
}
