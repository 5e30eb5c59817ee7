//! Question Content Provider: resolves question UUIDs to prompt content and
//! lists roles/questions for session setup.
//!
//! `AppState` carries an `Arc<dyn QuestionBank>`; the controller only needs the
//! narrower `QuestionContentProvider` and talks to it over HTTP.

pub mod handlers;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Difficulty, Question, QuestionCategory, QuestionSummary, Role};

/// Read-only question content, as consumed by the session controller.
#[async_trait]
pub trait QuestionContentProvider: Send + Sync {
    async fn get_question(&self, uuid: Uuid) -> Result<Question, AppError>;

    async fn get_roles_by_industry(&self, industry: &str) -> Result<Vec<Role>, AppError>;

    async fn get_questions_by_role(&self, role_id: Uuid) -> Result<Vec<QuestionSummary>, AppError>;
}

/// Server-side bank: content lookups plus the filters used to plan a session.
#[async_trait]
pub trait QuestionBank: QuestionContentProvider {
    async fn find_role(&self, role_id: Uuid) -> Result<Role, AppError>;

    /// Questions for `role_id` at `difficulty` whose category is listed, in
    /// stable bank order.
    async fn eligible_questions(
        &self,
        role_id: Uuid,
        difficulty: Difficulty,
        categories: &[QuestionCategory],
    ) -> Result<Vec<Question>, AppError>;
}
