//! Post-hoc performance metrics. Pure reductions over the response list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::question::QuestionCategory;
use crate::models::session::{InterviewSession, QuestionResponse};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub total_questions: usize,
    pub answered: usize,
    /// 0.0 to 100.0
    pub completion_percentage: f64,
    pub total_word_count: usize,
    pub average_word_count: f64,
    pub total_response_seconds: u64,
    pub average_response_seconds: f64,
    pub category_breakdown: BTreeMap<QuestionCategory, usize>,
}

pub fn compute_session_summary(session: &InterviewSession) -> SessionSummary {
    summarize_responses(session.total_questions(), session.responses())
}

/// Averages are 0 when nothing has been answered; completion is 0 for an
/// empty sequence. Totals saturate at their type's maximum.
pub fn summarize_responses(total_questions: usize, responses: &[QuestionResponse]) -> SessionSummary {
    let answered = responses.len();
    let total_word_count = responses
        .iter()
        .fold(0usize, |total, r| total.saturating_add(r.word_count));
    let total_response_seconds = responses
        .iter()
        .fold(0u64, |total, r| total.saturating_add(r.response_duration_seconds));

    let mut category_breakdown = BTreeMap::new();
    for response in responses {
        *category_breakdown
            .entry(response.question_category)
            .or_insert(0) += 1;
    }

    let average = |total: f64| {
        if answered == 0 {
            0.0
        } else {
            total / answered as f64
        }
    };

    let completion_percentage = if total_questions == 0 {
        0.0
    } else {
        (answered as f64 / total_questions as f64 * 100.0).clamp(0.0, 100.0)
    };

    SessionSummary {
        total_questions,
        answered,
        completion_percentage,
        total_word_count,
        average_word_count: average(total_word_count as f64),
        total_response_seconds,
        average_response_seconds: average(total_response_seconds as f64),
        category_breakdown,
    }
}
