//! `POST /generate`: writes the page script for a prompt.

use async_trait::async_trait;
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::generation::{ScriptGenerator, ScriptRequest};
use panelkit_core::page::{Page, pages_from_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::BackendClient;

const ENDPOINT: &str = "generate";

/// [`ScriptGenerator`] backed by the HTTP backend.
#[derive(Debug, Clone, Default)]
pub struct HttpScriptGenerator {
    client: BackendClient,
}

impl HttpScriptGenerator {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct GenerateScriptBody<'a> {
    api_key: Option<&'a str>,
    google_api_key: Option<&'a str>,
    prompt: &'a str,
    page_count: u32,
    comic_style: &'a str,
    language: &'a str,
    rows_per_page: u32,
}

impl<'a> From<&'a ScriptRequest> for GenerateScriptBody<'a> {
    fn from(request: &'a ScriptRequest) -> Self {
        Self {
            api_key: request.credentials.as_deref(),
            google_api_key: request.credentials.as_deref(),
            prompt: &request.prompt,
            page_count: request.page_count,
            comic_style: &request.style,
            language: &request.language,
            rows_per_page: request.rows_per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateScriptResponse {
    #[serde(default)]
    success: bool,
    pages: Option<Value>,
    error: Option<String>,
}

impl GenerateScriptResponse {
    fn into_pages(self) -> Result<Vec<Page>> {
        match self.pages {
            Some(pages) if self.success => pages_from_value(pages).map_err(|e| {
                PanelkitError::generation_failed(None, format!("Backend returned an invalid script: {e}"))
            }),
            _ => Err(PanelkitError::generation_failed(
                None,
                self.error
                    .unwrap_or_else(|| "Script generation failed".to_string()),
            )),
        }
    }
}

#[async_trait]
impl ScriptGenerator for HttpScriptGenerator {
    async fn generate_script(&self, request: ScriptRequest) -> Result<Vec<Page>> {
        let body = GenerateScriptBody::from(&request);
        let response: GenerateScriptResponse = self.client.post_json(ENDPOINT, &body).await?;
        let pages = response.into_pages()?;
        tracing::debug!(pages = pages.len(), "Received page script");
        Ok(pages)
    }
}
