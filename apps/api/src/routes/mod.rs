pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::questions::handlers as questions;
use crate::sessions::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Question Content Provider
        .route(
            "/api/v1/industries/:industry/roles",
            get(questions::handle_roles_by_industry),
        )
        .route(
            "/api/v1/roles/:role_id/questions",
            get(questions::handle_questions_by_role),
        )
        .route("/api/v1/questions/:uuid", get(questions::handle_get_question))
        // Session Authority
        .route(
            "/api/v1/interview-sessions",
            post(sessions::handle_start_session),
        )
        .route(
            "/api/v1/interview-sessions/:id",
            get(sessions::handle_get_session),
        )
        .route(
            "/api/v1/interview-sessions/:id/responses",
            post(sessions::handle_submit_response),
        )
        .route(
            "/api/v1/interview-sessions/:id/complete",
            post(sessions::handle_complete_session),
        )
        .route(
            "/api/v1/interview-sessions/:id/abandon",
            post(sessions::handle_abandon_session),
        )
        .route(
            "/api/v1/interview-sessions/:id/summary",
            get(sessions::handle_session_summary),
        )
        .route(
            "/api/v1/interview-sessions/:id/export",
            get(sessions::handle_export_session),
        )
        .with_state(state)
}
