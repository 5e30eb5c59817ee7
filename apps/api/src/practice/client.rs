//! HTTP client for a remote session authority and question content provider.
//!
//! Error bodies are mapped back through `AppError::from_body`, so the
//! controller sees the same error taxonomy as it does in process.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, Method, Request, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AppError, ErrorBody};
use crate::models::question::{Question, QuestionSummary, Role};
use crate::models::session::InterviewSession;
use crate::questions::QuestionContentProvider;
use crate::sessions::authority::{
    AbandonAck, CompletionArtifact, SessionAuthority, StartSessionRequest, StartSessionResponse,
    SubmitOutcome, SubmitResponseRequest,
};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 250;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (1-based): 250ms, 500ms, 1s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.saturating_sub(1).min(6))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Rebuilds an `AppError` from a non-success response body.
pub fn error_from_response(status: StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => AppError::from_body(status.as_u16(), &parsed),
        Err(_) => AppError::Upstream(format!("status {status}: {body}")),
    }
}

#[derive(Clone)]
pub struct HttpAuthorityClient {
    client: Client,
    base_url: Url,
}

impl HttpAuthorityClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Validation(format!("Invalid service URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "Service URL '{base_url}' cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// `<base>/api/v1/<segments...>`, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(anyhow!("Service URL cannot carry a path")))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn request<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Request, AppError> {
        let builder = self.client.request(method, url);
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        builder
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to build request: {e}")))
    }

    /// Sends `request`, retrying transport failures, 429 and 5xx responses
    /// with exponential backoff up to `attempts` times.
    async fn send<T: DeserializeOwned>(&self, request: Request, attempts: u32) -> Result<T, AppError> {
        let target = format!("{} {}", request.method(), request.url().path());
        let mut last_error: Option<AppError> = None;

        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "{target} attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let attempt_request = request
                .try_clone()
                .ok_or_else(|| AppError::Internal(anyhow!("Request body for {target} cannot be replayed")))?;

            let response = match self.client.execute(attempt_request).await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(AppError::Upstream(format!("{target}: {e}")));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let error = error_from_response(status, &body);
                if is_retryable(status) {
                    warn!("{target} returned {status}");
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }

            debug!("{target} -> {status}");
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::Upstream(format!("{target}: invalid response body: {e}")));
        }

        Err(last_error.unwrap_or_else(|| AppError::Upstream(format!("{target}: no attempt made"))))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AppError> {
        let request = self.request::<()>(Method::GET, self.endpoint(segments)?, None)?;
        self.send(request, MAX_ATTEMPTS).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Option<&B>,
        attempts: u32,
    ) -> Result<T, AppError> {
        let request = self.request(Method::POST, self.endpoint(segments)?, body)?;
        self.send(request, attempts).await
    }
}

#[async_trait]
impl SessionAuthority for HttpAuthorityClient {
    async fn start(&self, request: StartSessionRequest) -> Result<StartSessionResponse, AppError> {
        // Not replayed: a retried start would create a second session.
        self.post_json(&["interview-sessions"], Some(&request), 1)
            .await
    }

    async fn get(&self, session_id: Uuid) -> Result<InterviewSession, AppError> {
        self.get_json(&["interview-sessions", &session_id.to_string()])
            .await
    }

    async fn submit_response(
        &self,
        session_id: Uuid,
        request: SubmitResponseRequest,
    ) -> Result<SubmitOutcome, AppError> {
        // Replays are safe: the authority matches them by question_index.
        let attempts = if request.question_index.is_some() {
            MAX_ATTEMPTS
        } else {
            1
        };
        self.post_json(
            &["interview-sessions", &session_id.to_string(), "responses"],
            Some(&request),
            attempts,
        )
        .await
    }

    async fn complete(&self, session_id: Uuid) -> Result<CompletionArtifact, AppError> {
        self.post_json::<(), _>(
            &["interview-sessions", &session_id.to_string(), "complete"],
            None,
            MAX_ATTEMPTS,
        )
        .await
    }

    async fn abandon(&self, session_id: Uuid) -> Result<AbandonAck, AppError> {
        self.post_json::<(), _>(
            &["interview-sessions", &session_id.to_string(), "abandon"],
            None,
            MAX_ATTEMPTS,
        )
        .await
    }
}

#[async_trait]
impl QuestionContentProvider for HttpAuthorityClient {
    async fn get_question(&self, uuid: Uuid) -> Result<Question, AppError> {
        self.get_json(&["questions", &uuid.to_string()]).await
    }

    async fn get_roles_by_industry(&self, industry: &str) -> Result<Vec<Role>, AppError> {
        self.get_json(&["industries", industry, "roles"]).await
    }

    async fn get_questions_by_role(&self, role_id: Uuid) -> Result<Vec<QuestionSummary>, AppError> {
        self.get_json(&["roles", &role_id.to_string(), "questions"])
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, StorageBackend};
    use crate::models::session::SessionStatus;
    use crate::routes::build_router;
    use crate::sessions::memory::fixtures::{fixture, Fixture, ANSWER};
    use crate::sessions::memory::InMemorySessionAuthority;
    use crate::state::AppState;

    async fn serve(fx: &Fixture) -> HttpAuthorityClient {
        let state = AppState {
            authority: Arc::new(InMemorySessionAuthority::new(fx.bank.clone())),
            questions: fx.bank.clone(),
            config: Config {
                storage: StorageBackend::Memory {
                    question_bank_path: PathBuf::from("bank.json"),
                },
                port: 0,
                rust_log: "info".to_string(),
            },
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        HttpAuthorityClient::new(&format!("http://{addr}")).unwrap()
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(250));
        assert_eq!(backoff_delay(2), Duration::from_millis(500));
        assert_eq!(backoff_delay(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::CONFLICT));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_error_body_maps_back_to_app_error() {
        let body = r#"{"error":{"code":"CONFLICT","message":"Session is abandoned"}}"#;
        assert!(matches!(
            error_from_response(StatusCode::CONFLICT, body),
            AppError::Conflict(ref m) if m == "Session is abandoned"
        ));
        assert!(matches!(
            error_from_response(StatusCode::BAD_GATEWAY, "<html>proxy</html>"),
            AppError::Upstream(_)
        ));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = HttpAuthorityClient::new("http://localhost:8080/").unwrap();
        let url = client
            .endpoint(&["industries", "financial services", "roles"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/industries/financial%20services/roles"
        );
        assert!(HttpAuthorityClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_session_round_trip_over_http() {
        let fx = fixture(2);
        let client = serve(&fx).await;

        let started = client.start(fx.start_request()).await.unwrap();
        let id = started.session.id();
        assert_eq!(started.first_question.uuid, fx.questions[0].uuid);

        let question = client.get_question(started.first_question.uuid).await.unwrap();
        assert_eq!(question.prompt, fx.questions[0].prompt);

        let outcome = client
            .submit_response(
                id,
                SubmitResponseRequest {
                    response_text: ANSWER.to_string(),
                    response_duration_seconds: 9,
                    question_index: Some(0),
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::NextQuestion { next_question } if next_question.number == 2));

        let session = client.get(id).await.unwrap();
        assert_eq!(session.responses().len(), 1);

        let ack = client.abandon(id).await.unwrap();
        assert_eq!(ack.status, SessionStatus::Abandoned);
    }

    #[tokio::test]
    async fn test_service_errors_keep_their_kind() {
        let fx = fixture(1);
        let client = serve(&fx).await;

        assert!(matches!(
            client.get(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));

        let id = client.start(fx.start_request()).await.unwrap().session.id();
        let err = client
            .submit_response(
                id,
                SubmitResponseRequest {
                    response_text: "too short".to_string(),
                    response_duration_seconds: 1,
                    question_index: Some(0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(matches!(client.complete(id).await, Err(AppError::Conflict(_))));

        let roles = client.get_roles_by_industry("tech").await.unwrap();
        assert_eq!(roles.len(), 1);
        let questions = client.get_questions_by_role(fx.role.id).await.unwrap();
        assert_eq!(questions.len(), 1);
    }
}
