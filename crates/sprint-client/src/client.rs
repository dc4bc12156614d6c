use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Anti-forgery token supplied by the page; sent as `X-CSRFToken` when
    /// present. Obtaining it is out of scope here.
    pub csrf_token: Option<String>,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

/// Issues the single deep-sprint request. Any transport failure or non-2xx
/// response is fatal to the run; there is no retry.
#[derive(Debug, Clone)]
pub struct SprintClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl SprintClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = config.csrf_token.as_deref() {
            headers.insert(
                "X-CSRFToken",
                HeaderValue::from_str(token.trim()).map_err(|error| {
                    TransportError::InvalidConfig(format!("invalid CSRF token header: {error}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            // Connect timeout only: the response body is an open-ended
            // stream and must not be bounded by a whole-request deadline.
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    fn sprint_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/execute_deep_sprint") {
            return base.to_string();
        }

        format!("{base}/execute_deep_sprint")
    }

    /// POSTs the ordered step titles and hands back the streaming response.
    pub async fn execute_deep_sprint(
        &self,
        research_steps: &[String],
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(self.sprint_url())
            .json(&json!({ "research_steps": research_steps }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}
