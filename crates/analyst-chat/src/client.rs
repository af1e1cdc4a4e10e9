//! Transport to the remote analysis service.

use std::time::Duration;

use analyst_core::config::ServiceConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Request body accepted by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub input_value: String,
    pub output_type: String,
    pub input_type: String,
    pub session_id: String,
}

impl ChatRequest {
    pub fn chat(session_id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            input_value: input.into(),
            output_type: "chat".to_string(),
            input_type: "chat".to_string(),
            session_id: session_id.into(),
        }
    }
}

/// One request, one raw response body.
///
/// Any failure to obtain a 2xx body is a [`ChatError::Transport`].
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn run(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// HTTP implementation posting JSON to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    endpoint_url: String,
}

impl HttpAnalysisClient {
    /// Build a client from config. A `timeout_secs` of zero disables the timeout.
    pub fn new(config: &ServiceConfig) -> Result<Self, ChatError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn run(&self, request: &ChatRequest) -> Result<String, ChatError> {
        tracing::debug!(
            session_id = %request.session_id,
            endpoint = %self.endpoint_url,
            "Posting to analysis service"
        );

        let response = self
            .client
            .post(&self.endpoint_url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, bytes = body.len(), "Analysis service replied");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_shape() {
        let req = ChatRequest::chat("sess-1", "I want to change the login flow");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "input_value": "I want to change the login flow",
                "output_type": "chat",
                "input_type": "chat",
                "session_id": "sess-1"
            })
        );
    }

    #[test]
    fn test_http_client_builds_with_and_without_timeout() {
        let mut config = ServiceConfig::default();
        let client = HttpAnalysisClient::new(&config).unwrap();
        assert_eq!(client.endpoint_url(), config.endpoint_url);

        config.timeout_secs = 0;
        assert!(HttpAnalysisClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = ServiceConfig {
            endpoint_url: "http://127.0.0.1:9/run".to_string(),
            timeout_secs: 5,
        };
        let client = HttpAnalysisClient::new(&config).unwrap();
        let err = client
            .run(&ChatRequest::chat("sess-1", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}
