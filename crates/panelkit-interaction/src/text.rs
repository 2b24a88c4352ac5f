//! `POST /optimize-prompt` and `POST /generate-session-title`.

use async_trait::async_trait;
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::generation::{PromptOptimizer, SessionTitler, TextRequestContext};
use panelkit_core::page::Page;
use serde::{Deserialize, Serialize};

use crate::client::BackendClient;

/// [`PromptOptimizer`] backed by the HTTP backend.
#[derive(Debug, Clone, Default)]
pub struct HttpPromptOptimizer {
    client: BackendClient,
}

impl HttpPromptOptimizer {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct OptimizePromptBody<'a> {
    google_api_key: Option<&'a str>,
    prompt: &'a str,
    comic_style: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct OptimizePromptResponse {
    #[serde(default)]
    success: bool,
    optimized_prompt: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl PromptOptimizer for HttpPromptOptimizer {
    async fn optimize(&self, prompt: &str, context: &TextRequestContext) -> Result<String> {
        let body = OptimizePromptBody {
            google_api_key: context.credentials.as_deref(),
            prompt,
            comic_style: &context.style,
            language: &context.language,
        };
        let response: OptimizePromptResponse =
            self.client.post_json("optimize-prompt", &body).await?;
        non_empty(response.success, response.optimized_prompt, response.error)
    }
}

/// [`SessionTitler`] backed by the HTTP backend.
#[derive(Debug, Clone, Default)]
pub struct HttpSessionTitler {
    client: BackendClient,
}

impl HttpSessionTitler {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct SessionTitleBody<'a> {
    google_api_key: Option<&'a str>,
    prompt: &'a str,
    language: &'a str,
    comic_data: &'a [Page],
}

#[derive(Deserialize)]
struct SessionTitleResponse {
    #[serde(default)]
    success: bool,
    title: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl SessionTitler for HttpSessionTitler {
    async fn title(
        &self,
        prompt: &str,
        pages: &[Page],
        context: &TextRequestContext,
    ) -> Result<String> {
        let body = SessionTitleBody {
            google_api_key: context.credentials.as_deref(),
            prompt,
            language: &context.language,
            comic_data: pages,
        };
        let response: SessionTitleResponse = self
            .client
            .post_json("generate-session-title", &body)
            .await?;
        non_empty(response.success, response.title, response.error)
    }
}

fn non_empty(success: bool, text: Option<String>, error: Option<String>) -> Result<String> {
    match text.map(|t| t.trim().to_string()) {
        Some(text) if success && !text.is_empty() => Ok(text),
        _ => Err(PanelkitError::generation_failed(
            None,
            error.unwrap_or_else(|| "Backend returned no text".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(
            non_empty(true, Some("  A title \n".into()), None).unwrap(),
            "A title"
        );
    }

    #[test]
    fn test_blank_or_unsuccessful_is_error() {
        assert!(non_empty(true, Some("  ".into()), None).is_err());
        let err = non_empty(false, None, Some("no key".into())).unwrap_err();
        assert_eq!(err, PanelkitError::generation_failed(None, "no key"));
    }

    #[test]
    fn test_title_body_wire_format() {
        let pages = vec![Page::default()];
        let body = SessionTitleBody {
            google_api_key: None,
            prompt: "cats in space",
            language: "en",
            comic_data: &pages,
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["prompt"], "cats in space");
        assert!(json["comic_data"].is_array());
        assert!(json["google_api_key"].is_null());
    }
}
