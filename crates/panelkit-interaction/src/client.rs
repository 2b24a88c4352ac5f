//! Shared HTTP plumbing for the generation backend.

use std::time::Duration;

use panelkit_core::error::{PanelkitError, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5003/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// JSON-over-HTTP client for the backend under `base_url`.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `body` to `path` and decodes the JSON reply.
    ///
    /// Every failure (unreachable backend, non-2xx status, undecodable body)
    /// is reported as `GenerationFailed` without a page index.
    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "Backend request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                PanelkitError::generation_failed(None, format!("Request to {url} failed: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        response.json().await.map_err(|err| {
            PanelkitError::generation_failed(None, format!("Failed to parse backend response: {err}"))
        })
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Falling back to default HTTP client");
            Client::new()
        })
}

/// Prefers the backend's `{"error": "..."}` message over the bare status.
pub(crate) fn map_http_error(status: StatusCode, body_text: &str) -> PanelkitError {
    let message = serde_json::from_str::<serde_json::Value>(body_text)
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("API request failed: {}", status.as_u16()));
    PanelkitError::generation_failed(None, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = BackendClient::new("http://host/api/");
        assert_eq!(client.endpoint("/generate-image"), "http://host/api/generate-image");
        assert_eq!(BackendClient::default().base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_http_error_uses_backend_message() {
        let err = map_http_error(StatusCode::BAD_REQUEST, r#"{"error": "page_data is required"}"#);
        assert_eq!(
            err,
            PanelkitError::generation_failed(None, "page_data is required")
        );

        let err = map_http_error(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(
            err,
            PanelkitError::generation_failed(None, "API request failed: 502")
        );
    }
}
