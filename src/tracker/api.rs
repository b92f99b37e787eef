//! HTTP transport for the server session API.
//!
//! The playback core only ever observes these calls through the
//! [`SessionApi`] seam, so tests can substitute an in-memory transport and
//! the production client stays a thin `reqwest` wrapper.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session API client errors. Always caught and logged at the tracker call
/// sites; never surfaced into the playback path.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("api error {0}: {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Event type for mid-session lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEventType {
    Pause,
    Resume,
    Seek,
}

/// Why a session ended before natural completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    NextSong,
    UserSkip,
    PageClose,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartRequest {
    pub sha_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub position_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRequest {
    pub session_id: String,
    pub event_type: SessionEventType,
    pub position_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteRequest {
    pub session_id: String,
    pub final_position_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndRequest {
    pub session_id: String,
    pub final_position_ms: u64,
    pub reason: EndReason,
}

/// Transport seam over the session endpoints.
pub trait SessionApi: Send + Sync + 'static {
    fn start(
        &self,
        req: StartRequest,
    ) -> impl Future<Output = Result<StartResponse, TrackerError>> + Send;

    fn event(&self, req: EventRequest) -> impl Future<Output = Result<(), TrackerError>> + Send;

    fn complete(
        &self,
        req: CompleteRequest,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send;

    fn end(&self, req: EndRequest) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

/// Production transport: JSON over HTTP against the stats backend.
#[derive(Clone)]
pub struct HttpSessionApi {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSessionApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TrackerError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Network(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!(url = %url, "Posting session request");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TrackerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TrackerError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

impl SessionApi for HttpSessionApi {
    fn start(
        &self,
        req: StartRequest,
    ) -> impl Future<Output = Result<StartResponse, TrackerError>> + Send {
        async move {
            let response = self.post("/play/start", &req).await?;
            response
                .json::<StartResponse>()
                .await
                .map_err(|e| TrackerError::Parse(e.to_string()))
        }
    }

    fn event(&self, req: EventRequest) -> impl Future<Output = Result<(), TrackerError>> + Send {
        async move {
            self.post("/play/event", &req).await?;
            Ok(())
        }
    }

    fn complete(
        &self,
        req: CompleteRequest,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send {
        async move {
            self.post("/play/complete", &req).await?;
            Ok(())
        }
    }

    fn end(&self, req: EndRequest) -> impl Future<Output = Result<(), TrackerError>> + Send {
        async move {
            self.post("/play/end", &req).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_omits_absent_context() {
        let req = StartRequest {
            sha_id: "abc".to_string(),
            context_type: None,
            context_id: None,
            position_ms: 0,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"sha_id": "abc", "position_ms": 0}));
    }

    #[test]
    fn end_reason_uses_snake_case_wire_names() {
        let req = EndRequest {
            session_id: "s1".to_string(),
            final_position_ms: 1500,
            reason: EndReason::PageClose,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["reason"], "page_close");
    }

    #[test]
    fn event_type_wire_names_are_lowercase() {
        let req = EventRequest {
            session_id: "s1".to_string(),
            event_type: SessionEventType::Resume,
            position_ms: 42,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["event_type"], "resume");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = HttpSessionApi::new("http://localhost:8080/").unwrap();
        assert_eq!(api.base_url, "http://localhost:8080");
    }
}
