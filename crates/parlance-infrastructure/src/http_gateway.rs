//! HTTP implementation of the backend gateway.
//!
//! Talks JSON to the chat backend over `reqwest`. Failure kinds are
//! classified for the state machine: transport errors map to `Network`
//! (retryable, queueable), 401/403 to `Auth`, 404 to `NotFound`, and any
//! other non-success status to `ServerRejected`.
//!
//! Configuration priority: explicit constructor arguments, then the
//! `PARLANCE_API_URL` / `PARLANCE_API_KEY` environment variables.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use parlance_core::error::{ParlanceError, Result};
use parlance_core::gateway::{BackendGateway, SendOutcome};
use parlance_core::session::{Message, PersonalizedSuggestions, Session, UserContext};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
// Sends wait on model inference and deserve more headroom.
const SEND_TIMEOUT: Duration = Duration::from_secs(120);

/// JSON-over-HTTP [`BackendGateway`].
#[derive(Clone)]
pub struct HttpBackendGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    text: &'a str,
    language: &'a str,
    context: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    session_id: String,
    #[serde(default)]
    message_id: Option<String>,
    reply: ReplyBody,
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    text: String,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExportResponse {
    path: String,
}

impl HttpBackendGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Builds a gateway from `PARLANCE_API_URL` and `PARLANCE_API_KEY`.
    pub fn try_from_env() -> Result<Self> {
        let base_url = env::var("PARLANCE_API_URL").map_err(|_| {
            ParlanceError::internal("PARLANCE_API_URL not found in environment variables")
        })?;
        let api_key = env::var("PARLANCE_API_KEY").ok();
        Ok(Self::new(base_url, api_key))
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(timeout);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request
    }

    /// Resolves a non-success response into the matching failure kind.
    async fn classify_failure(response: reqwest::Response) -> ParlanceError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        classify_status(status, &body)
    }

    async fn check<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

fn classify_status(status: StatusCode, body: &str) -> ParlanceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ParlanceError::Auth(format!("{status}: {body}"))
        }
        StatusCode::NOT_FOUND => ParlanceError::NotFound {
            entity_type: "resource",
            id: body.to_string(),
        },
        _ => ParlanceError::ServerRejected(format!("{status}: {body}")),
    }
}

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    async fn send(
        &self,
        session_id: Option<&str>,
        text: &str,
        context: &UserContext,
    ) -> Result<SendOutcome> {
        let body = SendRequest {
            session_id,
            text,
            language: &context.language,
            context: &context.profile,
        };
        let response = self
            .request(Method::POST, "/messages", SEND_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let parsed: SendResponse = Self::check(response).await?;

        let assistant_message =
            Message::assistant(parsed.reply.text).with_suggestions(parsed.reply.suggestions);
        Ok(SendOutcome {
            session_id: parsed.session_id,
            confirmed_message_id: parsed.message_id,
            assistant_message,
        })
    }

    async fn create_session(&self, title: Option<&str>) -> Result<Session> {
        let response = self
            .request(Method::POST, "/sessions", DEFAULT_TIMEOUT)
            .json(&CreateSessionRequest { title })
            .send()
            .await?;
        Self::check(response).await
    }

    async fn switch_session(&self, session_id: &str) -> Result<Session> {
        let response = self
            .request(Method::GET, &format!("/sessions/{session_id}"), DEFAULT_TIMEOUT)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ParlanceError::not_found("Session", session_id));
        }
        Self::check(response).await
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let response = self
            .request(Method::GET, "/sessions", DEFAULT_TIMEOUT)
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::check(response).await
    }

    async fn get_suggestions(&self, session_id: &str) -> Result<PersonalizedSuggestions> {
        let response = self
            .request(
                Method::GET,
                &format!("/sessions/{session_id}/suggestions"),
                DEFAULT_TIMEOUT,
            )
            .send()
            .await?;
        Self::check(response).await
    }

    async fn export_history(&self, session_id: &str) -> Result<String> {
        let response = self
            .request(
                Method::POST,
                &format!("/sessions/{session_id}/export"),
                DEFAULT_TIMEOUT,
            )
            .send()
            .await?;
        let parsed: ExportResponse = Self::check(response).await?;
        Ok(parsed.path)
    }

    async fn clear_history(&self, session_id: &str) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/sessions/{session_id}/messages"),
                DEFAULT_TIMEOUT,
            )
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_classify_as_auth() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "expired"),
            ParlanceError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "nope"),
            ParlanceError::Auth(_)
        ));
    }

    #[test]
    fn not_found_classifies_as_not_found() {
        assert!(classify_status(StatusCode::NOT_FOUND, "gone").is_not_found());
    }

    #[test]
    fn other_statuses_classify_as_server_rejected() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = classify_status(status, "boom");
            assert!(matches!(err, ParlanceError::ServerRejected(_)));
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn send_request_omits_missing_session_id() {
        let body = SendRequest {
            session_id: None,
            text: "hi",
            language: "en",
            context: &serde_json::Value::Null,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("session_id").is_none());
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = HttpBackendGateway::new("https://api.example.com/", None);
        assert_eq!(gateway.base_url, "https://api.example.com");
    }
}
