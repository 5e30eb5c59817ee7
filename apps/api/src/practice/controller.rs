//! Session controller: the client-side state machine for one timed session.
//!
//! The controller never advances its own cursor. After every submission it
//! adopts whatever the authority reports, so a retried or reordered request
//! cannot make the two sides drift.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::{QuestionRef, SessionStatus};
use crate::practice::phase::{
    ActiveQuestion, Notice, NoticeLevel, Phase, TerminalReason, TimerKind, PREVIEW_SECONDS,
};
use crate::practice::scheduler::{PhaseScheduler, TimerProbe, TimerTick, TICK_PERIOD};
use crate::questions::QuestionContentProvider;
use crate::sessions::authority::{
    AbandonAck, CompletionArtifact, SessionAuthority, StartSessionRequest, SubmitOutcome,
    SubmitResponseRequest,
};
use crate::sessions::validation::{
    validate_response, word_count, MAX_RESPONSE_CHARS, MIN_RESPONSE_WORDS,
};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Interview session could not be loaded: {0}")]
    SessionUnavailable(AppError),

    #[error("Cannot {action} while {phase}")]
    PhaseMismatch {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Response has {words} words; at least {minimum} are required")]
    ResponseTooShort { words: usize, minimum: usize },

    #[error("Response exceeds {limit} characters")]
    ResponseTooLong { limit: usize },

    #[error("Abandon was not requested")]
    AbandonNotRequested,

    #[error(transparent)]
    Authority(#[from] AppError),
}

/// What a successful submission led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStep {
    NextQuestion(QuestionRef),
    SequenceExhausted,
}

pub struct SessionController {
    session_id: Uuid,
    authority: Arc<dyn SessionAuthority>,
    content: Arc<dyn QuestionContentProvider>,
    phase: Phase,
    /// Advisory mirror of the authority's `current_question_index`.
    cursor: usize,
    total: usize,
    draft: String,
    star_guide_open: bool,
    abandon_pending: bool,
    notices: Vec<Notice>,
    scheduler: PhaseScheduler,
    ticks: UnboundedReceiver<TimerTick>,
}

impl SessionController {
    /// A controller for an existing session, still in `Loading`.
    pub fn new(
        session_id: Uuid,
        authority: Arc<dyn SessionAuthority>,
        content: Arc<dyn QuestionContentProvider>,
    ) -> Self {
        let (scheduler, ticks) = PhaseScheduler::new(TICK_PERIOD);
        Self {
            session_id,
            authority,
            content,
            phase: Phase::Loading,
            cursor: 0,
            total: 0,
            draft: String::new(),
            star_guide_open: false,
            abandon_pending: false,
            notices: Vec::new(),
            scheduler,
            ticks,
        }
    }

    /// Asks the authority for a new session and loads it.
    pub async fn create(
        authority: Arc<dyn SessionAuthority>,
        content: Arc<dyn QuestionContentProvider>,
        request: StartSessionRequest,
    ) -> Result<Self, ControllerError> {
        let started = authority.start(request).await?;
        let mut controller = Self::new(started.session.id(), authority, content);
        controller.load().await?;
        Ok(controller)
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn star_guide_open(&self) -> bool {
        self.star_guide_open
    }

    pub fn abandon_pending(&self) -> bool {
        self.abandon_pending
    }

    pub fn active_timer(&self) -> Option<TimerKind> {
        self.scheduler.active()
    }

    pub fn timer_probe(&self) -> TimerProbe {
        self.scheduler.probe()
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.draft)
    }

    /// True only while answering with a response that passes validation.
    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::Answering { .. }) && validate_response(&self.draft).passed
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ── loading ─────────────────────────────────────────────────────────────

    /// Fetches the session and enters the phase it implies.
    ///
    /// A session that cannot be fetched is fatal: the controller ends in
    /// `Terminal(Unavailable)`. Question content that cannot be resolved is
    /// not; the session proceeds with a warning.
    pub async fn load(&mut self) -> Result<(), ControllerError> {
        self.scheduler.cancel();
        self.phase = Phase::Loading;

        let session = match self.authority.get(self.session_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to load interview session {}: {e}", self.session_id);
                self.notify(
                    NoticeLevel::Error,
                    format!("This interview session could not be loaded: {e}"),
                );
                self.enter_terminal(TerminalReason::Unavailable);
                return Err(ControllerError::SessionUnavailable(e));
            }
        };

        self.cursor = session.current_question_index();
        self.total = session.total_questions();

        match session.status() {
            SessionStatus::Completed => self.enter_terminal(TerminalReason::Completed),
            SessionStatus::Abandoned => self.enter_terminal(TerminalReason::Abandoned),
            SessionStatus::InProgress => match session.current_question() {
                Some(reference) => {
                    let question = self.resolve(reference).await;
                    self.enter_preview(question);
                }
                None => self.enter_terminal(TerminalReason::SequenceExhausted),
            },
        }

        info!(
            "Loaded session {} at question {}/{} ({})",
            self.session_id,
            self.cursor + 1,
            self.total,
            self.phase.name()
        );
        Ok(())
    }

    async fn resolve(&mut self, reference: QuestionRef) -> ActiveQuestion {
        let content = match self.content.get_question(reference.uuid).await {
            Ok(question) => Some(question),
            Err(e) => {
                warn!("Failed to resolve question {}: {e}", reference.uuid);
                self.notify(
                    NoticeLevel::Warning,
                    format!(
                        "Question {} of {} could not be loaded: {e}",
                        reference.number, reference.total
                    ),
                );
                None
            }
        };
        ActiveQuestion { reference, content }
    }

    /// Re-fetches content for the current question when it is missing.
    /// Returns whether content is now available.
    pub async fn retry_question_content(&mut self) -> Result<bool, ControllerError> {
        let Some(question) = self.phase.question() else {
            return Err(self.mismatch("retry question content"));
        };
        if question.content.is_some() {
            return Ok(true);
        }

        let reference = question.reference;
        match self.content.get_question(reference.uuid).await {
            Ok(content) => {
                if let Some(question) = self.phase.question_mut() {
                    question.content = Some(content);
                }
                Ok(true)
            }
            Err(e) => {
                self.notify(
                    NoticeLevel::Warning,
                    format!("Question {} is still unavailable: {e}", reference.number),
                );
                Ok(false)
            }
        }
    }

    // ── timers ──────────────────────────────────────────────────────────────

    /// Waits for the next tick from the running timer. Pending forever when
    /// no timer is running.
    pub async fn next_tick(&mut self) -> Option<TimerTick> {
        self.ticks.recv().await
    }

    /// Applies a tick to the phase that owns it. Stale ticks are ignored.
    ///
    /// The preview-to-answering transition is not made here but in
    /// `check_countdown`, which only fires while the phase is still
    /// `Preview` at zero.
    pub fn on_tick(&mut self, tick: TimerTick) -> bool {
        if !self.scheduler.is_current(&tick) {
            debug!(
                "Dropping stale {:?} tick (generation {})",
                tick.kind, tick.generation
            );
            return false;
        }

        match (&mut self.phase, tick.kind) {
            (Phase::Preview { remaining, .. }, TimerKind::Countdown) => {
                *remaining = remaining.saturating_sub(1);
            }
            (
                Phase::Answering {
                    started_at,
                    elapsed,
                    ..
                },
                TimerKind::Stopwatch,
            ) => {
                *elapsed = started_at.elapsed().as_secs();
            }
            _ => return false,
        }

        self.check_countdown();
        true
    }

    fn check_countdown(&mut self) -> bool {
        if !matches!(self.phase, Phase::Preview { remaining: 0, .. }) {
            return false;
        }
        match std::mem::replace(&mut self.phase, Phase::Loading) {
            Phase::Preview { question, .. } => {
                self.enter_answering(question, Instant::now());
                true
            }
            other => {
                self.phase = other;
                false
            }
        }
    }

    /// Feeds timer ticks into the controller until `done` holds. Returns
    /// `false` if no timer is left that could make progress.
    pub async fn drive_until(&mut self, mut done: impl FnMut(&Self) -> bool) -> bool {
        loop {
            if done(self) {
                return true;
            }
            if self.scheduler.active().is_none() {
                return false;
            }
            match self.ticks.recv().await {
                Some(tick) => {
                    self.on_tick(tick);
                }
                None => return false,
            }
        }
    }

    fn enter_preview(&mut self, question: ActiveQuestion) {
        self.draft.clear();
        self.star_guide_open = false;
        self.abandon_pending = false;
        self.scheduler.start(TimerKind::Countdown);
        self.phase = Phase::Preview {
            question,
            remaining: PREVIEW_SECONDS,
        };
    }

    fn enter_answering(&mut self, question: ActiveQuestion, started_at: Instant) {
        self.scheduler.start(TimerKind::Stopwatch);
        self.phase = Phase::Answering {
            question,
            started_at,
            elapsed: started_at.elapsed().as_secs(),
        };
    }

    fn enter_terminal(&mut self, reason: TerminalReason) {
        self.scheduler.cancel();
        self.abandon_pending = false;
        self.phase = Phase::Terminal(reason);
    }

    // ── answering ───────────────────────────────────────────────────────────

    pub fn update_draft(&mut self, text: impl Into<String>) -> Result<(), ControllerError> {
        if !matches!(self.phase, Phase::Answering { .. }) {
            return Err(self.mismatch("edit the response"));
        }
        self.draft = text.into();
        Ok(())
    }

    pub fn toggle_star_guide(&mut self) -> Result<bool, ControllerError> {
        if !matches!(self.phase, Phase::Preview { .. } | Phase::Answering { .. }) {
            return Err(self.mismatch("toggle the STAR guide"));
        }
        self.star_guide_open = !self.star_guide_open;
        Ok(self.star_guide_open)
    }

    /// Validates locally, then hands the response to the authority.
    ///
    /// A response that fails validation never reaches the network. On an
    /// authority error the controller returns to `Answering` with the draft
    /// and the first start time intact.
    pub async fn submit(&mut self) -> Result<SubmitStep, ControllerError> {
        let (question, started_at) = match std::mem::replace(&mut self.phase, Phase::Loading) {
            Phase::Answering {
                question,
                started_at,
                ..
            } => (question, started_at),
            other => {
                self.phase = other;
                return Err(self.mismatch("submit"));
            }
        };

        let validation = validate_response(&self.draft);
        if !validation.passed {
            self.phase = Phase::Answering {
                question,
                started_at,
                elapsed: started_at.elapsed().as_secs(),
            };
            if let Some(message) = validation.message {
                self.notify(NoticeLevel::Warning, message);
            }
            return Err(if validation.word_count < MIN_RESPONSE_WORDS {
                ControllerError::ResponseTooShort {
                    words: validation.word_count,
                    minimum: MIN_RESPONSE_WORDS,
                }
            } else {
                ControllerError::ResponseTooLong {
                    limit: MAX_RESPONSE_CHARS,
                }
            });
        }

        let duration = started_at.elapsed().as_secs();
        self.scheduler.cancel();
        self.abandon_pending = false;
        self.phase = Phase::Submitting {
            question: question.clone(),
        };

        let request = SubmitResponseRequest {
            response_text: self.draft.clone(),
            response_duration_seconds: duration,
            question_index: Some(self.cursor),
        };

        match self
            .authority
            .submit_response(self.session_id, request)
            .await
        {
            Ok(SubmitOutcome::NextQuestion { next_question }) => {
                info!(
                    "Session {} advanced to question {}/{}",
                    self.session_id, next_question.number, next_question.total
                );
                self.cursor = next_question.index();
                self.total = next_question.total;
                let next = self.resolve(next_question).await;
                self.enter_preview(next);
                Ok(SubmitStep::NextQuestion(next_question))
            }
            Ok(SubmitOutcome::Completed { .. }) => {
                info!("Session {} has no questions left", self.session_id);
                self.cursor = self.total;
                self.draft.clear();
                self.enter_terminal(TerminalReason::SequenceExhausted);
                Ok(SubmitStep::SequenceExhausted)
            }
            Err(e) => {
                warn!("Submission for session {} failed: {e}", self.session_id);
                self.notify(
                    NoticeLevel::Error,
                    format!("Your response was not saved: {e}. Please try again."),
                );
                self.enter_answering(question, started_at);
                Err(e.into())
            }
        }
    }

    // ── abandon ─────────────────────────────────────────────────────────────

    /// First half of the two-step abandon. Timers keep running until the
    /// abandon is confirmed.
    pub fn request_abandon(&mut self) -> Result<(), ControllerError> {
        if !self.phase.accepts_abandon() {
            return Err(self.mismatch("abandon"));
        }
        self.abandon_pending = true;
        Ok(())
    }

    pub fn cancel_abandon(&mut self) {
        self.abandon_pending = false;
    }

    pub async fn confirm_abandon(&mut self) -> Result<AbandonAck, ControllerError> {
        if !self.abandon_pending {
            return Err(ControllerError::AbandonNotRequested);
        }
        self.abandon_pending = false;
        if !self.phase.accepts_abandon() {
            return Err(self.mismatch("abandon"));
        }

        match self.authority.abandon(self.session_id).await {
            Ok(ack) => {
                self.enter_terminal(TerminalReason::Abandoned);
                info!(
                    "Session {} abandoned at question {}/{}",
                    self.session_id,
                    self.cursor + 1,
                    self.total
                );
                Ok(ack)
            }
            Err(e) => {
                warn!("Abandon for session {} failed: {e}", self.session_id);
                self.notify(
                    NoticeLevel::Error,
                    format!("The session could not be abandoned: {e}"),
                );
                Err(e.into())
            }
        }
    }

    // ── finalize / teardown ─────────────────────────────────────────────────

    /// Explicitly completes an exhausted session.
    pub async fn finalize(&mut self) -> Result<CompletionArtifact, ControllerError> {
        if self.phase != Phase::Terminal(TerminalReason::SequenceExhausted) {
            return Err(self.mismatch("finalize"));
        }

        self.phase = Phase::Finalizing;
        match self.authority.complete(self.session_id).await {
            Ok(artifact) => {
                self.enter_terminal(TerminalReason::Completed);
                info!("Session {} finalized", self.session_id);
                Ok(artifact)
            }
            Err(e) => {
                warn!("Finalizing session {} failed: {e}", self.session_id);
                self.notify(
                    NoticeLevel::Error,
                    format!("The session could not be finalized: {e}"),
                );
                self.phase = Phase::Terminal(TerminalReason::SequenceExhausted);
                Err(e.into())
            }
        }
    }

    /// Stops every timer and waits for the timer task to be gone.
    pub async fn teardown(mut self) {
        self.scheduler.shutdown().await;
        debug!(
            "Session controller for {} torn down in {}",
            self.session_id,
            self.phase.name()
        );
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }

    fn mismatch(&self, action: &'static str) -> ControllerError {
        ControllerError::PhaseMismatch {
            action,
            phase: self.phase.name(),
        }
    }
}
