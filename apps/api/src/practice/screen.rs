//! Hosts a `SessionController` for the lifetime of one interview screen.
//!
//! Timer ticks and user commands are multiplexed with `tokio::select!`; a
//! fresh `ScreenView` is published after every event. However the loop
//! ends, the controller is torn down before `run_screen` returns.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::practice::controller::{ControllerError, SessionController};
use crate::practice::phase::{Notice, Phase, TerminalReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    Input(String),
    Submit,
    RequestAbandon,
    ConfirmAbandon,
    CancelAbandon,
    ToggleStarGuide,
    RetryQuestion,
    Finalize,
    Close,
}

/// Where the host should navigate once the screen is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenExit {
    /// The session is completed; show its summary.
    Summary(Uuid),
    Abandoned,
    /// The session could not be loaded.
    Redirect,
    Closed,
}

/// Render-ready snapshot of the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenView {
    pub phase: &'static str,
    pub question_number: Option<usize>,
    pub total_questions: usize,
    pub prompt: Option<String>,
    pub expected_skills: Vec<String>,
    pub countdown: Option<u32>,
    pub elapsed_seconds: Option<u64>,
    pub word_count: usize,
    pub can_submit: bool,
    pub star_guide_open: bool,
    pub abandon_pending: bool,
    pub terminal: Option<TerminalReason>,
    /// Notices raised since the previous snapshot.
    pub notices: Vec<Notice>,
}

impl ScreenView {
    fn capture(controller: &mut SessionController) -> Self {
        let notices = controller.take_notices();
        let phase = controller.phase();
        let question = phase.question();
        let content = question.and_then(|q| q.content.as_ref());

        Self {
            phase: phase.name(),
            question_number: question.map(|q| q.reference.number),
            total_questions: controller.total(),
            prompt: content.map(|q| q.prompt.clone()),
            expected_skills: content
                .map(|q| q.expected_skills.clone())
                .unwrap_or_default(),
            countdown: match phase {
                Phase::Preview { remaining, .. } => Some(*remaining),
                _ => None,
            },
            elapsed_seconds: match phase {
                Phase::Answering { elapsed, .. } => Some(*elapsed),
                _ => None,
            },
            word_count: controller.word_count(),
            can_submit: controller.can_submit(),
            star_guide_open: controller.star_guide_open(),
            abandon_pending: controller.abandon_pending(),
            terminal: phase.terminal_reason(),
            notices,
        }
    }
}

fn exit_for(controller: &SessionController) -> Option<ScreenExit> {
    match controller.phase().terminal_reason()? {
        TerminalReason::Completed => Some(ScreenExit::Summary(controller.session_id())),
        TerminalReason::Abandoned => Some(ScreenExit::Abandoned),
        TerminalReason::Unavailable => Some(ScreenExit::Redirect),
        // Stays on screen until finalize succeeds.
        TerminalReason::SequenceExhausted => None,
    }
}

async fn apply(
    controller: &mut SessionController,
    command: ScreenCommand,
) -> Result<(), ControllerError> {
    match command {
        ScreenCommand::Input(text) => controller.update_draft(text),
        ScreenCommand::Submit => controller.submit().await.map(drop),
        ScreenCommand::RequestAbandon => controller.request_abandon(),
        ScreenCommand::ConfirmAbandon => controller.confirm_abandon().await.map(drop),
        ScreenCommand::CancelAbandon => {
            controller.cancel_abandon();
            Ok(())
        }
        ScreenCommand::ToggleStarGuide => controller.toggle_star_guide().map(drop),
        ScreenCommand::RetryQuestion => controller.retry_question_content().await.map(drop),
        ScreenCommand::Finalize => controller.finalize().await.map(drop),
        ScreenCommand::Close => Ok(()),
    }
}

/// Runs the screen until the session leaves it or the host closes it.
///
/// An exhausted session is finalized automatically; if that fails the
/// screen stays up and `ScreenCommand::Finalize` retries.
pub async fn run_screen(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<ScreenCommand>,
    view: watch::Sender<ScreenView>,
) -> ScreenExit {
    let loaded = controller.load().await;
    view.send_replace(ScreenView::capture(&mut controller));

    let exit = if loaded.is_err() {
        ScreenExit::Redirect
    } else {
        loop {
            if controller.phase() == &Phase::Terminal(TerminalReason::SequenceExhausted) {
                if let Err(e) = controller.finalize().await {
                    debug!("Automatic finalize failed: {e}");
                }
                view.send_replace(ScreenView::capture(&mut controller));
            }
            if let Some(exit) = exit_for(&controller) {
                break exit;
            }

            tokio::select! {
                Some(tick) = controller.next_tick() => {
                    controller.on_tick(tick);
                }
                command = commands.recv() => match command {
                    None | Some(ScreenCommand::Close) => break ScreenExit::Closed,
                    Some(command) => {
                        if let Err(e) = apply(&mut controller, command).await {
                            debug!("Screen command rejected: {e}");
                        }
                    }
                },
            }

            view.send_replace(ScreenView::capture(&mut controller));
        }
    };

    info!(
        "Leaving interview screen for session {}: {exit:?}",
        controller.session_id()
    );
    controller.teardown().await;
    exit
}
