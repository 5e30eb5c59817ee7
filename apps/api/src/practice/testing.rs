//! Test doubles for driving the controller against the in-memory backend
//! with injectable failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Question, QuestionSummary, Role};
use crate::models::session::InterviewSession;
use crate::questions::memory::InMemoryQuestionBank;
use crate::questions::QuestionContentProvider;
use crate::sessions::authority::{
    AbandonAck, CompletionArtifact, SessionAuthority, StartSessionRequest, StartSessionResponse,
    SubmitOutcome, SubmitResponseRequest,
};
use crate::sessions::memory::InMemorySessionAuthority;

fn outage(operation: &str) -> AppError {
    AppError::Upstream(format!("{operation} failed: connection reset"))
}

/// Wraps `InMemorySessionAuthority`, counting calls and failing on demand.
pub struct ScriptedAuthority {
    inner: InMemorySessionAuthority,
    pub submit_calls: AtomicUsize,
    pub fail_get: AtomicBool,
    pub fail_submit: AtomicBool,
    /// Records the submission, then reports a failure to the caller.
    pub lose_submit_reply: AtomicBool,
    pub fail_abandon: AtomicBool,
    pub fail_complete: AtomicBool,
}

impl ScriptedAuthority {
    pub fn new(bank: Arc<InMemoryQuestionBank>) -> Self {
        Self {
            inner: InMemorySessionAuthority::new(bank),
            submit_calls: AtomicUsize::new(0),
            fail_get: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            lose_submit_reply: AtomicBool::new(false),
            fail_abandon: AtomicBool::new(false),
            fail_complete: AtomicBool::new(false),
        }
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionAuthority for ScriptedAuthority {
    async fn start(&self, request: StartSessionRequest) -> Result<StartSessionResponse, AppError> {
        self.inner.start(request).await
    }

    async fn get(&self, session_id: Uuid) -> Result<InterviewSession, AppError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(outage("get"));
        }
        self.inner.get(session_id).await
    }

    async fn submit_response(
        &self,
        session_id: Uuid,
        request: SubmitResponseRequest,
    ) -> Result<SubmitOutcome, AppError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(outage("submit"));
        }
        let outcome = self.inner.submit_response(session_id, request).await?;
        if self.lose_submit_reply.swap(false, Ordering::SeqCst) {
            return Err(outage("submit reply"));
        }
        Ok(outcome)
    }

    async fn complete(&self, session_id: Uuid) -> Result<CompletionArtifact, AppError> {
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(outage("complete"));
        }
        self.inner.complete(session_id).await
    }

    async fn abandon(&self, session_id: Uuid) -> Result<AbandonAck, AppError> {
        if self.fail_abandon.load(Ordering::SeqCst) {
            return Err(outage("abandon"));
        }
        self.inner.abandon(session_id).await
    }
}

/// Content provider whose `get_question` can be switched off.
pub struct FlakyContent {
    inner: Arc<InMemoryQuestionBank>,
    pub fail: AtomicBool,
}

impl FlakyContent {
    pub fn new(inner: Arc<InMemoryQuestionBank>) -> Self {
        Self {
            inner,
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl QuestionContentProvider for FlakyContent {
    async fn get_question(&self, uuid: Uuid) -> Result<Question, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(outage("question lookup"));
        }
        self.inner.get_question(uuid).await
    }

    async fn get_roles_by_industry(&self, industry: &str) -> Result<Vec<Role>, AppError> {
        self.inner.get_roles_by_industry(industry).await
    }

    async fn get_questions_by_role(&self, role_id: Uuid) -> Result<Vec<QuestionSummary>, AppError> {
        self.inner.get_questions_by_role(role_id).await
    }
}
