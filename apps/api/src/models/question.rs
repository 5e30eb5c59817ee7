use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Behavioral,
    Technical,
    Situational,
    Company,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 4] = [
        QuestionCategory::Behavioral,
        QuestionCategory::Technical,
        QuestionCategory::Situational,
        QuestionCategory::Company,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Behavioral => "behavioral",
            QuestionCategory::Technical => "technical",
            QuestionCategory::Situational => "situational",
            QuestionCategory::Company => "company",
        }
    }
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown question category '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Entry,
    Mid,
    Senior,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Entry => "entry",
            Difficulty::Mid => "mid",
            Difficulty::Senior => "senior",
        }
    }

    /// Planning estimate used for `estimated_duration_minutes`.
    pub fn minutes_per_question(&self) -> u32 {
        match self {
            Difficulty::Entry => 3,
            Difficulty::Mid => 5,
            Difficulty::Senior => 8,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(Difficulty::Entry),
            "mid" => Ok(Difficulty::Mid),
            "senior" => Ok(Difficulty::Senior),
            other => Err(AppError::Validation(format!(
                "Unknown difficulty level '{other}'"
            ))),
        }
    }
}

/// STAR answer scaffold shown alongside a behavioral prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StarFramework {
    pub situation: String,
    pub task: String,
    pub action: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub industry: String,
    pub name: String,
}

/// Full question content as resolved by the content provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub uuid: Uuid,
    pub role_id: Uuid,
    pub prompt: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub expected_skills: Vec<String>,
    #[serde(default)]
    pub star_framework: Option<StarFramework>,
    #[serde(default)]
    pub interviewer_guidance: Option<String>,
}

/// Listing shape for `get_questions_by_role`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionSummary {
    pub uuid: Uuid,
    pub prompt: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
}

impl From<&Question> for QuestionSummary {
    fn from(question: &Question) -> Self {
        Self {
            uuid: question.uuid,
            prompt: question.prompt.clone(),
            category: question.category,
            difficulty: question.difficulty,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub uuid: Uuid,
    pub role_id: Uuid,
    pub prompt: String,
    pub category: String,
    pub difficulty: String,
    pub expected_skills: Vec<String>,
    pub star_framework: Option<sqlx::types::Json<StarFramework>>,
    pub interviewer_guidance: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            uuid: row.uuid,
            role_id: row.role_id,
            prompt: row.prompt,
            category: row.category.parse()?,
            difficulty: row.difficulty.parse()?,
            expected_skills: row.expected_skills,
            star_framework: row.star_framework.map(|json| json.0),
            interviewer_guidance: row.interviewer_guidance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in QuestionCategory::ALL {
            assert_eq!(category.as_str().parse::<QuestionCategory>().unwrap(), category);
        }
        assert!("leadership".parse::<QuestionCategory>().is_err());
    }

    #[test]
    fn test_difficulty_minutes() {
        assert_eq!(Difficulty::Entry.minutes_per_question(), 3);
        assert_eq!(Difficulty::Mid.minutes_per_question(), 5);
        assert_eq!(Difficulty::Senior.minutes_per_question(), 8);
    }

    #[test]
    fn test_question_deserializes_without_optional_content() {
        let question: Question = serde_json::from_value(serde_json::json!({
            "uuid": Uuid::nil(),
            "role_id": Uuid::nil(),
            "prompt": "Walk me through a recent outage you handled.",
            "category": "situational",
            "difficulty": "mid"
        }))
        .unwrap();
        assert!(question.expected_skills.is_empty());
        assert!(question.star_framework.is_none());
        assert_eq!(question.category, QuestionCategory::Situational);
    }

    #[test]
    fn test_row_with_bad_category_is_rejected() {
        let row = QuestionRow {
            uuid: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            prompt: "Why us?".to_string(),
            category: "trivia".to_string(),
            difficulty: "entry".to_string(),
            expected_skills: vec![],
            star_framework: None,
            interviewer_guidance: None,
        };
        assert!(Question::try_from(row).is_err());
    }
}
