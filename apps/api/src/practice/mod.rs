//! Client-side session controller.
//!
//! Drives one mock interview through preview, answering, submission and
//! termination against any `SessionAuthority` and `QuestionContentProvider`:
//! the in-process backends or `client::HttpAuthorityClient`.

pub mod client;
pub mod controller;
pub mod phase;
pub mod scheduler;
pub mod screen;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ControllerError, SessionController, SubmitStep};
pub use phase::{Notice, NoticeLevel, Phase, TerminalReason};
pub use screen::{run_screen, ScreenCommand, ScreenExit, ScreenView};
