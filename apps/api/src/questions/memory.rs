use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Difficulty, Question, QuestionCategory, QuestionSummary, Role};
use crate::questions::{QuestionBank, QuestionContentProvider};

/// On-disk shape of a question bank seed file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBankFile {
    pub roles: Vec<Role>,
    pub questions: Vec<Question>,
}

/// Process-local question bank. Order of `questions` is the bank order used
/// when planning sessions.
#[derive(Debug, Clone)]
pub struct InMemoryQuestionBank {
    roles: Vec<Role>,
    questions: Vec<Question>,
}

impl InMemoryQuestionBank {
    pub fn new(roles: Vec<Role>, questions: Vec<Question>) -> Result<Self, AppError> {
        let role_ids: HashSet<Uuid> = roles.iter().map(|r| r.id).collect();
        let mut seen = HashSet::new();

        for question in &questions {
            if !role_ids.contains(&question.role_id) {
                return Err(AppError::Validation(format!(
                    "Question {} references unknown role {}",
                    question.uuid, question.role_id
                )));
            }
            if !seen.insert(question.uuid) {
                return Err(AppError::Validation(format!(
                    "Duplicate question {} in bank",
                    question.uuid
                )));
            }
        }

        Ok(Self { roles, questions })
    }

    /// Loads a `QuestionBankFile` from JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question bank {}", path.display()))?;
        let file: QuestionBankFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid question bank JSON in {}", path.display()))?;

        let bank = Self::new(file.roles, file.questions)
            .map_err(|e| anyhow::anyhow!("Invalid question bank {}: {e}", path.display()))?;
        info!(
            "Loaded question bank: {} roles, {} questions",
            bank.roles.len(),
            bank.questions.len()
        );
        Ok(bank)
    }
}

#[async_trait]
impl QuestionContentProvider for InMemoryQuestionBank {
    async fn get_question(&self, uuid: Uuid) -> Result<Question, AppError> {
        self.questions
            .iter()
            .find(|q| q.uuid == uuid)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Question {uuid} not found")))
    }

    async fn get_roles_by_industry(&self, industry: &str) -> Result<Vec<Role>, AppError> {
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|r| r.industry.eq_ignore_ascii_case(industry.trim()))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn get_questions_by_role(&self, role_id: Uuid) -> Result<Vec<QuestionSummary>, AppError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.role_id == role_id)
            .map(QuestionSummary::from)
            .collect())
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn find_role(&self, role_id: Uuid) -> Result<Role, AppError> {
        self.roles
            .iter()
            .find(|r| r.id == role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Role {role_id} not found")))
    }

    async fn eligible_questions(
        &self,
        role_id: Uuid,
        difficulty: Difficulty,
        categories: &[QuestionCategory],
    ) -> Result<Vec<Question>, AppError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| {
                q.role_id == role_id
                    && q.difficulty == difficulty
                    && categories.contains(&q.category)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn role(name: &str, industry: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            industry: industry.to_string(),
            name: name.to_string(),
        }
    }

    fn question(role_id: Uuid, category: QuestionCategory, difficulty: Difficulty) -> Question {
        Question {
            uuid: Uuid::new_v4(),
            role_id,
            prompt: format!("{category} question"),
            category,
            difficulty,
            expected_skills: vec!["communication".to_string()],
            star_framework: None,
            interviewer_guidance: None,
        }
    }

    #[tokio::test]
    async fn test_roles_by_industry_is_case_insensitive_and_sorted() {
        let bank = InMemoryQuestionBank::new(
            vec![
                role("Site Reliability Engineer", "Tech"),
                role("Backend Engineer", "tech"),
                role("Loan Officer", "Banking"),
            ],
            vec![],
        )
        .unwrap();

        let roles = bank.get_roles_by_industry("TECH").await.unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Backend Engineer", "Site Reliability Engineer"]);
    }

    #[tokio::test]
    async fn test_eligible_questions_filters_and_keeps_order() {
        let backend = role("Backend Engineer", "tech");
        let q1 = question(backend.id, QuestionCategory::Technical, Difficulty::Mid);
        let q2 = question(backend.id, QuestionCategory::Company, Difficulty::Mid);
        let q3 = question(backend.id, QuestionCategory::Technical, Difficulty::Senior);
        let q4 = question(backend.id, QuestionCategory::Behavioral, Difficulty::Mid);
        let bank = InMemoryQuestionBank::new(
            vec![backend.clone()],
            vec![q1.clone(), q2, q3, q4.clone()],
        )
        .unwrap();

        let eligible = bank
            .eligible_questions(
                backend.id,
                Difficulty::Mid,
                &[QuestionCategory::Behavioral, QuestionCategory::Technical],
            )
            .await
            .unwrap();
        let ids: Vec<Uuid> = eligible.iter().map(|q| q.uuid).collect();
        assert_eq!(ids, vec![q1.uuid, q4.uuid]);
    }

    #[tokio::test]
    async fn test_unknown_question_is_not_found() {
        let bank = InMemoryQuestionBank::new(vec![], vec![]).unwrap();
        assert!(matches!(
            bank.get_question(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_question_with_unknown_role() {
        let orphan = question(Uuid::new_v4(), QuestionCategory::Company, Difficulty::Entry);
        assert!(InMemoryQuestionBank::new(vec![], vec![orphan]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_question() {
        let r = role("Analyst", "finance");
        let q = question(r.id, QuestionCategory::Company, Difficulty::Entry);
        assert!(InMemoryQuestionBank::new(vec![r], vec![q.clone(), q]).is_err());
    }

    #[tokio::test]
    async fn test_from_path_loads_seed_file() {
        let r = role("Data Analyst", "retail");
        let q = question(r.id, QuestionCategory::Situational, Difficulty::Entry);
        let seed = QuestionBankFile {
            roles: vec![r.clone()],
            questions: vec![q.clone()],
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&seed).unwrap().as_bytes())
            .unwrap();

        let bank = InMemoryQuestionBank::from_path(file.path()).unwrap();
        assert_eq!(bank.get_question(q.uuid).await.unwrap(), q);
        assert_eq!(bank.get_questions_by_role(r.id).await.unwrap().len(), 1);
    }

    #[test]
    fn test_from_path_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = InMemoryQuestionBank::from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid question bank JSON"));
    }
}
