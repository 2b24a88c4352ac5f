//! Page domain model.
//!
//! A page is one unit of the narrative: a title and a stack of rows, each
//! row holding side-by-side panels.

use serde::{Deserialize, Serialize};

/// Default CSS height applied to rows that omit one.
pub const DEFAULT_ROW_HEIGHT: &str = "150px";

/// One unit of the narrative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    /// Page title (may be empty; generated pages usually carry one)
    #[serde(default)]
    pub title: String,
    /// Rows from top to bottom
    pub rows: Vec<Row>,
}

/// A horizontal strip of panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// CSS height of the row (e.g. "150px")
    #[serde(default = "default_row_height")]
    pub height: String,
    /// Panels from left to right
    pub panels: Vec<Panel>,
}

/// A single drawing cell with its caption/dialogue text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Panel {
    #[serde(default)]
    pub text: String,
    /// Optional background color, stored as `bg` on the wire
    #[serde(
        default,
        rename = "bg",
        alias = "backgroundColor",
        skip_serializing_if = "Option::is_none"
    )]
    pub background_color: Option<String>,
}

fn default_row_height() -> String {
    DEFAULT_ROW_HEIGHT.to_string()
}

impl Page {
    /// Title to show for this page, falling back to its 1-based position.
    pub fn display_title(&self, index: usize) -> String {
        if self.title.trim().is_empty() {
            format!("Page {}", index + 1)
        } else {
            self.title.clone()
        }
    }
}

impl Row {
    pub fn new(panels: Vec<Panel>) -> Self {
        Self {
            height: default_row_height(),
            panels,
        }
    }
}

impl Panel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            background_color: None,
        }
    }
}
