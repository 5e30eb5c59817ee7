use serde::Serialize;
use tokio::time::Instant;

use crate::models::question::Question;
use crate::models::session::QuestionRef;

/// Seconds a question is shown read-only before answering starts.
pub const PREVIEW_SECONDS: u32 = 5;

/// The question the controller is currently working on.
///
/// `content` is `None` when the content provider could not resolve the
/// question; the session still proceeds and the content can be retried.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveQuestion {
    pub reference: QuestionRef,
    pub content: Option<Question>,
}

impl ActiveQuestion {
    pub fn prompt(&self) -> Option<&str> {
        self.content.as_ref().map(|q| q.prompt.as_str())
    }

    pub fn has_star_guide(&self) -> bool {
        self.content
            .as_ref()
            .is_some_and(|q| q.star_framework.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Every question has a response; waiting for an explicit finalize.
    SequenceExhausted,
    Completed,
    Abandoned,
    /// The session record could not be loaded.
    Unavailable,
}

/// The two repeating timers. Never both active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Preview countdown, one decrement per second.
    Countdown,
    /// Answering stopwatch, counts up once per second.
    Stopwatch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Preview {
        question: ActiveQuestion,
        remaining: u32,
    },
    Answering {
        question: ActiveQuestion,
        started_at: Instant,
        elapsed: u64,
    },
    Submitting {
        question: ActiveQuestion,
    },
    Finalizing,
    Terminal(TerminalReason),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::Preview { .. } => "preview",
            Phase::Answering { .. } => "answering",
            Phase::Submitting { .. } => "submitting",
            Phase::Finalizing => "finalizing",
            Phase::Terminal(_) => "terminal",
        }
    }

    /// The timer that belongs to this phase, if any.
    pub fn timer(&self) -> Option<TimerKind> {
        match self {
            Phase::Preview { .. } => Some(TimerKind::Countdown),
            Phase::Answering { .. } => Some(TimerKind::Stopwatch),
            _ => None,
        }
    }

    pub fn question(&self) -> Option<&ActiveQuestion> {
        match self {
            Phase::Preview { question, .. }
            | Phase::Answering { question, .. }
            | Phase::Submitting { question } => Some(question),
            _ => None,
        }
    }

    pub(crate) fn question_mut(&mut self) -> Option<&mut ActiveQuestion> {
        match self {
            Phase::Preview { question, .. }
            | Phase::Answering { question, .. }
            | Phase::Submitting { question } => Some(question),
            _ => None,
        }
    }

    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        match self {
            Phase::Terminal(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Abandon is accepted from these phases only.
    pub fn accepts_abandon(&self) -> bool {
        matches!(self, Phase::Preview { .. } | Phase::Answering { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}
