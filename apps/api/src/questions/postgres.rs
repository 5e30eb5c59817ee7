use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{
    Difficulty, Question, QuestionCategory, QuestionRow, QuestionSummary, Role,
};
use crate::questions::{QuestionBank, QuestionContentProvider};

const QUESTION_COLUMNS: &str = "uuid, role_id, prompt, category, difficulty, expected_skills, \
     star_framework, interviewer_guidance";

/// Question bank backed by the `roles` and `interview_questions` tables.
#[derive(Clone)]
pub struct PgQuestionBank {
    pool: PgPool,
}

impl PgQuestionBank {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_questions(rows: Vec<QuestionRow>) -> Result<Vec<Question>, AppError> {
    rows.into_iter().map(Question::try_from).collect()
}

#[async_trait]
impl QuestionContentProvider for PgQuestionBank {
    async fn get_question(&self, uuid: Uuid) -> Result<Question, AppError> {
        let row: Option<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM interview_questions WHERE uuid = $1"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound(format!("Question {uuid} not found")))?
            .try_into()
    }

    async fn get_roles_by_industry(&self, industry: &str) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, industry, name FROM roles WHERE lower(industry) = lower($1) ORDER BY name",
        )
        .bind(industry.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn get_questions_by_role(&self, role_id: Uuid) -> Result<Vec<QuestionSummary>, AppError> {
        let rows: Vec<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM interview_questions \
             WHERE role_id = $1 ORDER BY created_at, uuid"
        ))
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_questions(rows)?
            .iter()
            .map(QuestionSummary::from)
            .collect())
    }
}

#[async_trait]
impl QuestionBank for PgQuestionBank {
    async fn find_role(&self, role_id: Uuid) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>("SELECT id, industry, name FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {role_id} not found")))
    }

    async fn eligible_questions(
        &self,
        role_id: Uuid,
        difficulty: Difficulty,
        categories: &[QuestionCategory],
    ) -> Result<Vec<Question>, AppError> {
        let categories: Vec<String> = categories.iter().map(|c| c.as_str().to_string()).collect();

        let rows: Vec<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM interview_questions \
             WHERE role_id = $1 AND difficulty = $2 AND category = ANY($3) \
             ORDER BY created_at, uuid"
        ))
        .bind(role_id)
        .bind(difficulty.as_str())
        .bind(&categories)
        .fetch_all(&self.pool)
        .await?;

        into_questions(rows)
    }
}
