use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::InterviewSession;
use crate::questions::QuestionBank;
use crate::sessions::authority::{
    reconcile_cursor, AbandonAck, CompletionArtifact, SessionAuthority, StartSessionRequest,
    StartSessionResponse, SubmitOutcome, SubmitResponseRequest,
};
use crate::sessions::planning::plan_session;
use crate::sessions::summary::compute_session_summary;

/// Session authority holding sessions in process memory.
///
/// Each operation holds the write lock for its whole duration, so mutations
/// of a session are serialized.
pub struct InMemorySessionAuthority {
    bank: Arc<dyn QuestionBank>,
    sessions: RwLock<HashMap<Uuid, InterviewSession>>,
}

impl InMemorySessionAuthority {
    pub fn new(bank: Arc<dyn QuestionBank>) -> Self {
        Self {
            bank,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

fn not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Interview session {session_id} not found"))
}

#[async_trait]
impl SessionAuthority for InMemorySessionAuthority {
    async fn start(&self, request: StartSessionRequest) -> Result<StartSessionResponse, AppError> {
        let plan = plan_session(self.bank.as_ref(), &request).await?;
        let session = InterviewSession::start(Uuid::new_v4(), plan, Utc::now())?;
        let first_question = session
            .current_question()
            .ok_or_else(|| AppError::UnprocessableEntity("Session has no questions".to_string()))?;

        info!(
            "Started interview session {} ({} questions)",
            session.id(),
            session.total_questions()
        );
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());

        Ok(StartSessionResponse {
            session,
            first_question,
        })
    }

    async fn get(&self, session_id: Uuid) -> Result<InterviewSession, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    async fn submit_response(
        &self,
        session_id: Uuid,
        request: SubmitResponseRequest,
    ) -> Result<SubmitOutcome, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        if let Some(replayed) = reconcile_cursor(session, &request)? {
            return Ok(replayed);
        }

        let expected = session.expected_question()?;
        let question = self.bank.get_question(expected.uuid).await?;

        session.record_response(
            &question,
            &request.response_text,
            request.response_duration_seconds,
            Utc::now(),
        )?;

        let outcome = SubmitOutcome::after(session);
        info!(
            "Recorded response {}/{} for session {session_id}",
            expected.number, expected.total
        );
        Ok(outcome)
    }

    async fn complete(&self, session_id: Uuid) -> Result<CompletionArtifact, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        if session.complete(Utc::now())? {
            info!("Completed interview session {session_id}");
        }

        Ok(CompletionArtifact {
            summary: compute_session_summary(session),
            session: session.clone(),
        })
    }

    async fn abandon(&self, session_id: Uuid) -> Result<AbandonAck, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;

        if session.abandon(Utc::now())? {
            info!(
                "Abandoned interview session {session_id} at question {}",
                session.current_question_index() + 1
            );
        }

        Ok(AbandonAck::for_session(session))
    }
}
