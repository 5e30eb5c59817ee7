use std::sync::Arc;

use crate::config::Config;
use crate::questions::QuestionBank;
use crate::sessions::authority::SessionAuthority;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Canonical session store. Postgres or in-memory, chosen by `STORAGE_BACKEND`.
    pub authority: Arc<dyn SessionAuthority>,
    pub questions: Arc<dyn QuestionBank>,
    pub config: Config,
}
