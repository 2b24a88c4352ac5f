//! Boundaries to the remote services that render pages and refine text.
//!
//! The core only depends on these traits; HTTP implementations live in
//! `panelkit-interaction`.

use async_trait::async_trait;

use crate::artifact::ReferenceImage;
use crate::error::Result;
use crate::page::Page;

/// One page-render request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImageRequest {
    pub page: Page,
    pub style: String,
    pub language: String,
    pub rows_per_page: u32,
    /// Ordered context images; empty means unconstrained generation
    pub references: Vec<ReferenceImage>,
    pub credentials: Option<String>,
}

/// What the renderer reported for a [`PageImageRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImageResult {
    pub success: bool,
    pub image_reference: Option<String>,
    pub error_message: Option<String>,
}

impl PageImageResult {
    pub fn succeeded(image_reference: impl Into<String>) -> Self {
        Self {
            success: true,
            image_reference: Some(image_reference.into()),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            image_reference: None,
            error_message: Some(message.into()),
        }
    }

    /// The image reference of a usable result.
    ///
    /// A result claiming success without an image counts as a failure.
    pub fn into_image(self) -> std::result::Result<String, String> {
        match (self.success, self.image_reference) {
            (true, Some(image)) if !image.is_empty() => Ok(image),
            (true, _) => Err("No image returned".to_string()),
            (false, _) => Err(self
                .error_message
                .unwrap_or_else(|| "Image generation failed".to_string())),
        }
    }
}

/// Renders a page into an image.
///
/// Transport failures are returned as `Err`; the caller treats them the same
/// as `success == false`.
#[async_trait]
pub trait PageImageGenerator: Send + Sync {
    async fn generate(&self, request: PageImageRequest) -> Result<PageImageResult>;
}

/// A request to write the page script for a story prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    pub prompt: String,
    pub page_count: u32,
    pub rows_per_page: u32,
    pub style: String,
    pub language: String,
    pub credentials: Option<String>,
}

/// Turns a story prompt into pages of rows and panels.
///
/// Implementations return at least one page or an error.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate_script(&self, request: ScriptRequest) -> Result<Vec<Page>>;
}

/// Settings shared by the text helpers below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequestContext {
    pub style: String,
    pub language: String,
    pub credentials: Option<String>,
}

/// Rewrites a short story idea into a detailed description.
#[async_trait]
pub trait PromptOptimizer: Send + Sync {
    async fn optimize(&self, prompt: &str, context: &TextRequestContext) -> Result<String>;
}

/// Suggests a session title from its prompt and pages.
#[async_trait]
pub trait SessionTitler: Send + Sync {
    async fn title(
        &self,
        prompt: &str,
        pages: &[Page],
        context: &TextRequestContext,
    ) -> Result<String>;
}
