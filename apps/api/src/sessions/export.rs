//! Summary exporter: renders a session as plain text or HTML.

use minijinja::Environment;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::session::InterviewSession;
use crate::sessions::summary::compute_session_summary;
use crate::sessions::templates::{SESSION_HTML_TEMPLATE, SESSION_TEXT_TEMPLATE};

const TEXT_TEMPLATE_NAME: &str = "session.txt";
const HTML_TEMPLATE_NAME: &str = "session.html";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Text,
    Html,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
        }
    }
}

#[derive(Debug, Serialize)]
struct CategoryLine {
    name: &'static str,
    count: usize,
}

#[derive(Debug, Serialize)]
struct ResponseView<'a> {
    number: usize,
    category: &'static str,
    question_text: &'a str,
    response_text: &'a str,
    word_count: usize,
    duration: String,
}

#[derive(Debug, Serialize)]
struct ExportView<'a> {
    scenario_name: &'a str,
    session_id: String,
    industry: &'a str,
    difficulty: &'static str,
    status: &'static str,
    started_at: String,
    finished_at: Option<String>,
    estimated_duration_minutes: u32,
    completion: String,
    answered: usize,
    total_questions: usize,
    total_words: usize,
    average_words: String,
    average_duration: String,
    categories: Vec<CategoryLine>,
    responses: Vec<ResponseView<'a>>,
}

/// "45s", "2m 05s".
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    }
}

fn build_view(session: &InterviewSession) -> ExportView<'_> {
    let summary = compute_session_summary(session);
    let timestamp = |t: chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M UTC").to_string();

    ExportView {
        scenario_name: session.scenario_name(),
        session_id: session.id().to_string(),
        industry: session.industry(),
        difficulty: session.difficulty_level().as_str(),
        status: session.status().as_str(),
        started_at: timestamp(session.started_at()),
        finished_at: session
            .completed_at()
            .or(session.abandoned_at())
            .map(timestamp),
        estimated_duration_minutes: session.estimated_duration_minutes(),
        completion: format!("{:.1}%", summary.completion_percentage),
        answered: summary.answered,
        total_questions: summary.total_questions,
        total_words: summary.total_word_count,
        average_words: format!("{:.1}", summary.average_word_count),
        average_duration: format_duration(summary.average_response_seconds.round() as u64),
        categories: summary
            .category_breakdown
            .iter()
            .map(|(category, &count)| CategoryLine {
                name: category.as_str(),
                count,
            })
            .collect(),
        responses: session
            .responses()
            .iter()
            .enumerate()
            .map(|(i, r)| ResponseView {
                number: i + 1,
                category: r.question_category.as_str(),
                question_text: &r.question_text,
                response_text: &r.response_text,
                word_count: r.word_count,
                duration: format_duration(r.response_duration_seconds),
            })
            .collect(),
    }
}

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.add_template(TEXT_TEMPLATE_NAME, SESSION_TEXT_TEMPLATE)?;
    env.add_template(HTML_TEMPLATE_NAME, SESSION_HTML_TEMPLATE)?;
    Ok(env)
}

/// Renders header metadata, metrics and the full transcript. Works for any
/// session status.
pub fn render_session(session: &InterviewSession, format: ExportFormat) -> Result<String, AppError> {
    let template_name = match format {
        ExportFormat::Text => TEXT_TEMPLATE_NAME,
        ExportFormat::Html => HTML_TEMPLATE_NAME,
    };

    let env = environment().map_err(|e| AppError::Internal(e.into()))?;
    env.get_template(template_name)
        .and_then(|template| template.render(build_view(session)))
        .map_err(|e| AppError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, Question, QuestionCategory};
    use crate::models::session::NewSession;
    use chrono::Utc;
    use uuid::Uuid;

    fn answered_session(answer: &str) -> InterviewSession {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut session = InterviewSession::start(
            Uuid::new_v4(),
            NewSession {
                role_id: Uuid::nil(),
                industry: "logistics".to_string(),
                scenario_name: "Ops <Lead> rehearsal".to_string(),
                difficulty_level: Difficulty::Senior,
                estimated_duration_minutes: 16,
                question_sequence: vec![q1, q2],
            },
            Utc::now(),
        )
        .unwrap();
        let question = Question {
            uuid: q1,
            role_id: Uuid::nil(),
            prompt: "Tell me about a time you & your team missed a deadline.".to_string(),
            category: QuestionCategory::Behavioral,
            difficulty: Difficulty::Senior,
            expected_skills: vec![],
            star_framework: None,
            interviewer_guidance: None,
        };
        session
            .record_response(&question, answer, 125, Utc::now())
            .unwrap();
        session
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m 05s");
    }

    #[test]
    fn test_text_export_has_header_metrics_and_transcript() {
        let answer = "We missed the launch by a week, so I reset scope and communicated daily";
        let session = answered_session(answer);
        let text = render_session(&session, ExportFormat::Text).unwrap();

        assert!(text.starts_with("MOCK INTERVIEW SUMMARY"));
        assert!(text.contains("Scenario:    Ops <Lead> rehearsal"));
        assert!(text.contains("Difficulty:  senior"));
        assert!(text.contains("Status:      in_progress"));
        assert!(text.contains("Completion:        50.0% (1/2 questions)"));
        assert!(text.contains("behavioral: 1"));
        assert!(text.contains("Q1 [behavioral] Tell me about a time you & your team missed a deadline."));
        assert!(text.contains("Time: 2m 05s"));
        assert!(text.contains(answer));
    }

    #[test]
    fn test_html_export_escapes_user_content() {
        let answer = "I wrote <script>alert('x')</script> into the postmortem doc for the whole team";
        let session = answered_session(answer);
        let html = render_session(&session, ExportFormat::Html).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Ops &lt;Lead&gt; rehearsal"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("you &amp; your team"));
    }

    #[test]
    fn test_export_without_responses() {
        let session = InterviewSession::start(
            Uuid::new_v4(),
            NewSession {
                role_id: Uuid::nil(),
                industry: "logistics".to_string(),
                scenario_name: "Fresh".to_string(),
                difficulty_level: Difficulty::Entry,
                estimated_duration_minutes: 3,
                question_sequence: vec![Uuid::new_v4()],
            },
            Utc::now(),
        )
        .unwrap();
        let text = render_session(&session, ExportFormat::Text).unwrap();
        assert!(text.contains("No responses recorded."));
        assert!(text.contains("Completion:        0.0% (0/1 questions)"));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Html.content_type(), "text/html; charset=utf-8");
        assert_eq!(ExportFormat::Text.file_extension(), "txt");
        assert_eq!(ExportFormat::default(), ExportFormat::Text);
    }
}
