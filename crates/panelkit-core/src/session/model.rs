//! Session domain model.
//!
//! A session is one independently persisted unit of work: its pages, the
//! images generated for them, and the settings used to generate both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactVersionStore;
use crate::error::{PanelkitError, Result};
use crate::page::{PageCollection, PageInput};

pub const DEFAULT_STYLE: &str = "doraemon";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_PAGE_COUNT: u32 = 3;
pub const DEFAULT_ROWS_PER_PAGE: u32 = 4;

pub const MAX_PAGE_COUNT: u32 = 10;
pub const MAX_ROWS_PER_PAGE: u32 = 5;

/// Generation settings carried by each session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_page_count")]
    pub page_count: u32,
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: u32,
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_page_count() -> u32 {
    DEFAULT_PAGE_COUNT
}

fn default_rows_per_page() -> u32 {
    DEFAULT_ROWS_PER_PAGE
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            language: default_language(),
            page_count: DEFAULT_PAGE_COUNT,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }
}

impl SessionConfig {
    /// Checks the ranges the generation backend accepts.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAGE_COUNT).contains(&self.page_count) {
            return Err(PanelkitError::validation(format!(
                "Page count must be between 1 and {MAX_PAGE_COUNT}"
            )));
        }
        if !(1..=MAX_ROWS_PER_PAGE).contains(&self.rows_per_page) {
            return Err(PanelkitError::validation(format!(
                "Rows per page must be between 1 and {MAX_ROWS_PER_PAGE}"
            )));
        }
        if self.style.trim().is_empty() {
            return Err(PanelkitError::validation("Style must not be empty"));
        }
        if self.language.trim().is_empty() {
            return Err(PanelkitError::validation("Language must not be empty"));
        }
        Ok(())
    }
}

/// A user session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SessionRecord")]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session name
    pub name: String,
    /// Pages and the page cursor (`pages` + `currentPageIndex` on the wire)
    #[serde(flatten)]
    pub pages: PageCollection,
    /// Generated images keyed by page index
    pub artifacts: ArtifactVersionStore,
    #[serde(flatten)]
    pub config: SessionConfig,
    /// The story prompt the pages were (or will be) generated from
    pub prompt_text: String,
    /// Image the user uploaded to steer every page of this session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_reference_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored shape of a session.
///
/// Besides the current layout this accepts older saves, which keep the
/// pages under `comicData.pages` and use `generatedImages`, `prompt` and
/// `referenceImage` for the other fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: String,
    name: String,
    #[serde(default)]
    pages: Option<PageInput>,
    #[serde(default)]
    current_page_index: usize,
    #[serde(default)]
    comic_data: Option<ComicDataRecord>,
    #[serde(default, alias = "generatedImages")]
    artifacts: Option<ArtifactVersionStore>,
    #[serde(flatten)]
    config: SessionConfig,
    #[serde(default, alias = "prompt")]
    prompt_text: Option<String>,
    #[serde(default, alias = "referenceImage")]
    user_reference_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ComicDataRecord {
    #[serde(default)]
    pages: Option<PageInput>,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        let pages = match record.pages.map(PageInput::into_pages) {
            Some(pages) if !pages.is_empty() => pages,
            _ => record
                .comic_data
                .and_then(|data| data.pages)
                .map(PageInput::into_pages)
                .unwrap_or_default(),
        };

        Self {
            id: record.id,
            name: record.name,
            pages: PageCollection::from_parts(pages, record.current_page_index),
            artifacts: record.artifacts.unwrap_or_default(),
            config: record.config,
            prompt_text: record.prompt_text.unwrap_or_default(),
            user_reference_image: record.user_reference_image,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl Session {
    pub fn new(id: String, name: String, config: SessionConfig, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            pages: PageCollection::new(),
            artifacts: ArtifactVersionStore::new(),
            config,
            prompt_text: String::new(),
            user_reference_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A session with no prompt, no pages and no artifacts.
    ///
    /// Empty sessions are dropped when sessions are persisted or loaded,
    /// unless they are the current session.
    pub fn is_empty(&self) -> bool {
        self.prompt_text.trim().is_empty() && self.pages.is_empty() && self.artifacts.is_empty()
    }

    /// Merges the provided fields and bumps `updated_at`.
    pub fn apply(&mut self, patch: SessionPatch, now: DateTime<Utc>) {
        let SessionPatch {
            name,
            pages,
            artifacts,
            style,
            language,
            page_count,
            rows_per_page,
            prompt_text,
            user_reference_image,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(pages) = pages {
            self.pages = pages;
        }
        if let Some(artifacts) = artifacts {
            self.artifacts = artifacts;
        }
        if let Some(style) = style {
            self.config.style = style;
        }
        if let Some(language) = language {
            self.config.language = language;
        }
        if let Some(page_count) = page_count {
            self.config.page_count = page_count;
        }
        if let Some(rows_per_page) = rows_per_page {
            self.config.rows_per_page = rows_per_page;
        }
        if let Some(prompt_text) = prompt_text {
            self.prompt_text = prompt_text;
        }
        if let Some(user_reference_image) = user_reference_image {
            self.user_reference_image = user_reference_image;
        }

        self.updated_at = now;
    }
}

/// A partial update for [`Session::apply`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub pages: Option<PageCollection>,
    pub artifacts: Option<ArtifactVersionStore>,
    pub style: Option<String>,
    pub language: Option<String>,
    pub page_count: Option<u32>,
    pub rows_per_page: Option<u32>,
    pub prompt_text: Option<String>,
    /// `Some(None)` clears the reference image
    pub user_reference_image: Option<Option<String>>,
}

impl SessionPatch {
    /// The config fields this patch would produce on top of `base`.
    pub fn config_over(&self, base: &SessionConfig) -> SessionConfig {
        SessionConfig {
            style: self.style.clone().unwrap_or_else(|| base.style.clone()),
            language: self.language.clone().unwrap_or_else(|| base.language.clone()),
            page_count: self.page_count.unwrap_or(base.page_count),
            rows_per_page: self.rows_per_page.unwrap_or(base.rows_per_page),
        }
    }
}
