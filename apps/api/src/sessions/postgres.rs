use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::{InterviewSession, ResponseRow, SessionRow};
use crate::questions::QuestionBank;
use crate::sessions::authority::{
    reconcile_cursor, AbandonAck, CompletionArtifact, SessionAuthority, StartSessionRequest,
    StartSessionResponse, SubmitOutcome, SubmitResponseRequest,
};
use crate::sessions::planning::plan_session;
use crate::sessions::summary::compute_session_summary;

const SESSION_COLUMNS: &str = "id, role_id, industry, scenario_name, difficulty_level, \
     estimated_duration_minutes, question_sequence, current_question_index, status, \
     started_at, completed_at, abandoned_at";

const RESPONSE_COLUMNS: &str = "session_id, position, question_uuid, question_text, \
     question_category, response_text, response_duration_seconds, word_count, submitted_at";

/// Session authority backed by `interview_sessions` / `interview_responses`.
///
/// Responses are append-only rows; every mutation runs in a transaction that
/// locks the session row first.
pub struct PgSessionAuthority {
    pool: PgPool,
    bank: Arc<dyn QuestionBank>,
}

impl PgSessionAuthority {
    pub fn new(pool: PgPool, bank: Arc<dyn QuestionBank>) -> Self {
        Self { pool, bank }
    }

    async fn load(&self, session_id: Uuid) -> Result<InterviewSession, AppError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or_else(|| not_found(session_id))?;

        let responses: Vec<ResponseRow> = sqlx::query_as(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM interview_responses \
             WHERE session_id = $1 ORDER BY position"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        InterviewSession::from_rows(row, responses)
    }
}

fn not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Interview session {session_id} not found"))
}

/// Loads a session with its row locked for the rest of the transaction.
async fn load_for_update(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
) -> Result<InterviewSession, AppError> {
    let row: Option<SessionRow> = sqlx::query_as(&format!(
        "SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE id = $1 FOR UPDATE"
    ))
    .bind(session_id)
    .fetch_optional(&mut **tx)
    .await?;
    let row = row.ok_or_else(|| not_found(session_id))?;

    let responses: Vec<ResponseRow> = sqlx::query_as(&format!(
        "SELECT {RESPONSE_COLUMNS} FROM interview_responses \
         WHERE session_id = $1 ORDER BY position"
    ))
    .bind(session_id)
    .fetch_all(&mut **tx)
    .await?;

    InterviewSession::from_rows(row, responses)
}

/// Writes status and terminal timestamps back after `complete` / `abandon`.
async fn store_status(
    tx: &mut Transaction<'_, Postgres>,
    session: &InterviewSession,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE interview_sessions SET status = $1, completed_at = $2, abandoned_at = $3 \
         WHERE id = $4",
    )
    .bind(session.status().as_str())
    .bind(session.completed_at())
    .bind(session.abandoned_at())
    .bind(session.id())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn to_i32(value: usize, what: &str) -> Result<i32, AppError> {
    i32::try_from(value).map_err(|_| AppError::Validation(format!("{what} is out of range")))
}

#[async_trait]
impl SessionAuthority for PgSessionAuthority {
    async fn start(&self, request: StartSessionRequest) -> Result<StartSessionResponse, AppError> {
        let plan = plan_session(self.bank.as_ref(), &request).await?;
        let session = InterviewSession::start(Uuid::new_v4(), plan, Utc::now())?;
        let first_question = session
            .current_question()
            .ok_or_else(|| AppError::UnprocessableEntity("Session has no questions".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO interview_sessions
                (id, role_id, industry, scenario_name, difficulty_level,
                 estimated_duration_minutes, question_sequence, current_question_index,
                 status, started_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9)
            "#,
        )
        .bind(session.id())
        .bind(session.role_id())
        .bind(session.industry())
        .bind(session.scenario_name())
        .bind(session.difficulty_level().as_str())
        .bind(i32::try_from(session.estimated_duration_minutes()).unwrap_or(i32::MAX))
        .bind(session.question_sequence())
        .bind(session.status().as_str())
        .bind(session.started_at())
        .execute(&self.pool)
        .await?;

        info!(
            "Started interview session {} ({} questions)",
            session.id(),
            session.total_questions()
        );

        Ok(StartSessionResponse {
            session,
            first_question,
        })
    }

    async fn get(&self, session_id: Uuid) -> Result<InterviewSession, AppError> {
        self.load(session_id).await
    }

    async fn submit_response(
        &self,
        session_id: Uuid,
        request: SubmitResponseRequest,
    ) -> Result<SubmitOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut session = load_for_update(&mut tx, session_id).await?;

        if let Some(replayed) = reconcile_cursor(&session, &request)? {
            tx.rollback().await?;
            return Ok(replayed);
        }

        let expected = session.expected_question()?;
        let question = self.bank.get_question(expected.uuid).await?;
        let position = to_i32(session.current_question_index(), "Question index")?;

        let stored = session
            .record_response(
                &question,
                &request.response_text,
                request.response_duration_seconds,
                Utc::now(),
            )?
            .clone();

        // Append-only INSERT, then move the cursor.
        sqlx::query(&format!(
            "INSERT INTO interview_responses ({RESPONSE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(session_id)
        .bind(position)
        .bind(stored.question_uuid)
        .bind(&stored.question_text)
        .bind(stored.question_category.as_str())
        .bind(&stored.response_text)
        .bind(i64::try_from(stored.response_duration_seconds).unwrap_or(i64::MAX))
        .bind(to_i32(stored.word_count, "Word count")?)
        .bind(stored.submitted_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE interview_sessions SET current_question_index = $1 WHERE id = $2")
            .bind(to_i32(session.current_question_index(), "Question index")?)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            "Recorded response {}/{} for session {session_id}",
            expected.number, expected.total
        );
        Ok(SubmitOutcome::after(&session))
    }

    async fn complete(&self, session_id: Uuid) -> Result<CompletionArtifact, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut session = load_for_update(&mut tx, session_id).await?;

        if session.complete(Utc::now())? {
            store_status(&mut tx, &session).await?;
            info!("Completed interview session {session_id}");
        }
        tx.commit().await?;

        Ok(CompletionArtifact {
            summary: compute_session_summary(&session),
            session,
        })
    }

    async fn abandon(&self, session_id: Uuid) -> Result<AbandonAck, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut session = load_for_update(&mut tx, session_id).await?;

        if session.abandon(Utc::now())? {
            store_status(&mut tx, &session).await?;
            info!(
                "Abandoned interview session {session_id} at question {}",
                session.current_question_index() + 1
            );
        }
        tx.commit().await?;

        Ok(AbandonAck::for_session(&session))
    }
}
