//! Session Authority contract.
//!
//! The authority owns the canonical `InterviewSession`: it creates it, fixes
//! the question sequence, advances the cursor, appends responses and marks
//! terminal status. Backends (`InMemorySessionAuthority`, `PgSessionAuthority`)
//! and the controller's HTTP client all implement `SessionAuthority`, so the
//! controller can be pointed at any of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Difficulty, QuestionCategory};
use crate::models::session::{InterviewSession, QuestionRef, SessionStatus};
use crate::sessions::summary::SessionSummary;

// ────────────────────────────────────────────────────────────────────────────
// Contract types
// ────────────────────────────────────────────────────────────────────────────

/// Which question categories a session should draw from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryFlags {
    #[serde(default)]
    pub include_behavioral: bool,
    #[serde(default)]
    pub include_technical: bool,
    #[serde(default)]
    pub include_situational: bool,
    #[serde(default)]
    pub include_company: bool,
}

impl CategoryFlags {
    pub fn all() -> Self {
        Self {
            include_behavioral: true,
            include_technical: true,
            include_situational: true,
            include_company: true,
        }
    }

    pub fn categories(&self) -> Vec<QuestionCategory> {
        [
            (self.include_behavioral, QuestionCategory::Behavioral),
            (self.include_technical, QuestionCategory::Technical),
            (self.include_situational, QuestionCategory::Situational),
            (self.include_company, QuestionCategory::Company),
        ]
        .into_iter()
        .filter_map(|(on, category)| on.then_some(category))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub role_id: Uuid,
    pub industry: String,
    pub difficulty: Difficulty,
    pub categories: CategoryFlags,
    #[serde(default)]
    pub scenario_name: Option<String>,
    /// Cap on the sequence length; defaults to `DEFAULT_QUESTION_LIMIT`.
    #[serde(default)]
    pub question_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session: InterviewSession,
    pub first_question: QuestionRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponseRequest {
    pub response_text: String,
    pub response_duration_seconds: u64,
    /// The submitter's view of the cursor. Used to detect retries and
    /// out-of-order submissions; the authority's cursor always wins.
    #[serde(default)]
    pub question_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubmitOutcome {
    NextQuestion { next_question: QuestionRef },
    Completed { completed: bool },
}

impl SubmitOutcome {
    /// Outcome implied by the session's cursor after a successful submission.
    pub fn after(session: &InterviewSession) -> Self {
        match session.current_question() {
            Some(next_question) => SubmitOutcome::NextQuestion { next_question },
            None => SubmitOutcome::Completed { completed: true },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionArtifact {
    pub session: InterviewSession,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbandonAck {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub abandoned_at: Option<DateTime<Utc>>,
}

impl AbandonAck {
    pub fn for_session(session: &InterviewSession) -> Self {
        Self {
            session_id: session.id(),
            status: session.status(),
            abandoned_at: session.abandoned_at(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Fails with `Validation` when no category flag is set and with
    /// `UnprocessableEntity` when the role has no eligible questions.
    async fn start(&self, request: StartSessionRequest) -> Result<StartSessionResponse, AppError>;

    async fn get(&self, session_id: Uuid) -> Result<InterviewSession, AppError>;

    async fn submit_response(
        &self,
        session_id: Uuid,
        request: SubmitResponseRequest,
    ) -> Result<SubmitOutcome, AppError>;

    /// Explicit finalize step, separate from "sequence exhausted".
    async fn complete(&self, session_id: Uuid) -> Result<CompletionArtifact, AppError>;

    async fn abandon(&self, session_id: Uuid) -> Result<AbandonAck, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Shared submission rules
// ────────────────────────────────────────────────────────────────────────────

/// Reconciles the submitter's cursor with the authority's.
///
/// Returns `Some(outcome)` when the request is a retry of the submission that
/// produced the most recent response; the caller must not append anything.
/// A cursor that is neither current nor a retry is a `Conflict`, and so is
/// any submission to an abandoned session.
pub fn reconcile_cursor(
    session: &InterviewSession,
    request: &SubmitResponseRequest,
) -> Result<Option<SubmitOutcome>, AppError> {
    if session.status() == SessionStatus::Abandoned {
        return Err(AppError::Conflict(format!(
            "Cannot submit a response to session {}: it is {}",
            session.id(),
            session.status()
        )));
    }

    let cursor = session.current_question_index();

    let Some(claimed) = request.question_index else {
        return Ok(None);
    };

    if claimed == cursor {
        return Ok(None);
    }

    let is_retry = claimed.checked_add(1) == Some(cursor)
        && session
            .last_response()
            .is_some_and(|last| last.response_text == request.response_text);

    if is_retry {
        info!(
            "Replaying submission for session {} question index {claimed}",
            session.id()
        );
        return Ok(Some(SubmitOutcome::after(session)));
    }

    Err(AppError::Conflict(format!(
        "Submission targets question index {claimed} but session {} is at {cursor}",
        session.id()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;
    use crate::models::session::NewSession;

    const ANSWER: &str = "We profiled the service, found the hot loop and cut latency in half";

    fn session_with_first_answered() -> (InterviewSession, Uuid) {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut session = InterviewSession::start(
            Uuid::new_v4(),
            NewSession {
                role_id: Uuid::nil(),
                industry: "tech".to_string(),
                scenario_name: "Retry".to_string(),
                difficulty_level: Difficulty::Mid,
                estimated_duration_minutes: 10,
                question_sequence: vec![q1, q2],
            },
            Utc::now(),
        )
        .unwrap();
        let question = Question {
            uuid: q1,
            role_id: Uuid::nil(),
            prompt: "How did you speed up a slow service?".to_string(),
            category: QuestionCategory::Technical,
            difficulty: Difficulty::Mid,
            expected_skills: vec![],
            star_framework: None,
            interviewer_guidance: None,
        };
        session
            .record_response(&question, ANSWER, 20, Utc::now())
            .unwrap();
        (session, q2)
    }

    fn request(text: &str, index: Option<usize>) -> SubmitResponseRequest {
        SubmitResponseRequest {
            response_text: text.to_string(),
            response_duration_seconds: 20,
            question_index: index,
        }
    }

    #[test]
    fn test_category_flags_preserve_order() {
        let flags = CategoryFlags {
            include_company: true,
            include_behavioral: true,
            ..Default::default()
        };
        assert_eq!(
            flags.categories(),
            vec![QuestionCategory::Behavioral, QuestionCategory::Company]
        );
        assert!(CategoryFlags::default().categories().is_empty());
        assert_eq!(CategoryFlags::all().categories().len(), 4);
    }

    #[test]
    fn test_submit_outcome_wire_shape() {
        let next = SubmitOutcome::NextQuestion {
            next_question: QuestionRef {
                uuid: Uuid::nil(),
                number: 2,
                total: 3,
            },
        };
        let value = serde_json::to_value(next).unwrap();
        assert_eq!(value["next_question"]["number"], 2);

        let done = serde_json::to_value(SubmitOutcome::Completed { completed: true }).unwrap();
        assert_eq!(done, serde_json::json!({ "completed": true }));

        let parsed: SubmitOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, next);
    }

    #[test]
    fn test_reconcile_without_index_or_matching_index_records() {
        let (session, _) = session_with_first_answered();
        assert_eq!(reconcile_cursor(&session, &request(ANSWER, None)).unwrap(), None);
        assert_eq!(reconcile_cursor(&session, &request(ANSWER, Some(1))).unwrap(), None);
    }

    #[test]
    fn test_reconcile_replays_retry_of_last_submission() {
        let (session, q2) = session_with_first_answered();
        let outcome = reconcile_cursor(&session, &request(ANSWER, Some(0))).unwrap();
        assert_eq!(
            outcome,
            Some(SubmitOutcome::NextQuestion {
                next_question: QuestionRef {
                    uuid: q2,
                    number: 2,
                    total: 2
                }
            })
        );
    }

    #[test]
    fn test_reconcile_rejects_stale_cursor_with_different_text() {
        let (session, _) = session_with_first_answered();
        let err = reconcile_cursor(&session, &request("a different answer", Some(0))).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(matches!(
            reconcile_cursor(&session, &request(ANSWER, Some(5))),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_reconcile_rejects_maximal_index() {
        let (session, _) = session_with_first_answered();
        assert!(matches!(
            reconcile_cursor(&session, &request(ANSWER, Some(usize::MAX))),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_reconcile_does_not_replay_into_abandoned_session() {
        let (mut session, _) = session_with_first_answered();
        session.abandon(Utc::now()).unwrap();
        assert!(matches!(
            reconcile_cursor(&session, &request(ANSWER, Some(0))),
            Err(AppError::Conflict(_))
        ));
    }
}
