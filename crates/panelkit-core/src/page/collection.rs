//! Ordered page sequence with a navigation cursor.

use super::model::Page;
use crate::error::{PanelkitError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Either a single page or a sequence of pages.
///
/// Generators and hand-written scripts produce both shapes; `set_pages`
/// normalizes them into a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageInput {
    Many(Vec<Page>),
    Single(Page),
}

impl PageInput {
    pub fn into_pages(self) -> Vec<Page> {
        match self {
            PageInput::Many(pages) => pages,
            PageInput::Single(page) => vec![page],
        }
    }
}

impl From<Page> for PageInput {
    fn from(page: Page) -> Self {
        PageInput::Single(page)
    }
}

impl From<Vec<Page>> for PageInput {
    fn from(pages: Vec<Page>) -> Self {
        PageInput::Many(pages)
    }
}

/// The pages of one session plus the page currently shown.
///
/// Invariant: when `pages` is non-empty, `current_index < pages.len()`;
/// when empty, `current_index == 0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCollection {
    #[serde(default, deserialize_with = "null_as_empty")]
    pages: Vec<Page>,
    #[serde(default, rename = "currentPageIndex")]
    current_index: usize,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Page>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Page>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a collection from stored parts, pulling the cursor into range.
    pub(crate) fn from_parts(pages: Vec<Page>, current_index: usize) -> Self {
        let mut collection = Self {
            pages,
            current_index,
        };
        collection.clamp_cursor();
        collection
    }

    /// Replaces all pages and resets the cursor to the first page.
    pub fn set_pages(&mut self, input: impl Into<PageInput>) {
        self.pages = input.into().into_pages();
        self.current_index = 0;
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current(&self) -> Option<&Page> {
        self.pages.get(self.current_index)
    }

    pub fn get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Moves the cursor forward. Returns false at the last page.
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// Moves the cursor back. Returns false at the first page.
    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.pages.len()
    }

    pub fn has_prev(&self) -> bool {
        self.current_index > 0
    }

    /// Moves the cursor to `index`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `index` is outside `0..count()`.
    pub fn go_to(&mut self, index: usize) -> Result<()> {
        if index < self.pages.len() {
            self.current_index = index;
            Ok(())
        } else {
            Err(PanelkitError::not_found("page", index.to_string()))
        }
    }

    /// Replaces the page under the cursor. Returns false when there are no pages.
    pub fn update_current(&mut self, page: Page) -> bool {
        match self.pages.get_mut(self.current_index) {
            Some(slot) => {
                *slot = page;
                true
            }
            None => false,
        }
    }

    /// Sets the text of one panel on the current page.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no current page or the row/panel does not exist.
    pub fn set_panel_text(
        &mut self,
        row: usize,
        panel: usize,
        text: impl Into<String>,
    ) -> Result<()> {
        let page = self
            .pages
            .get_mut(self.current_index)
            .ok_or_else(|| PanelkitError::not_found("page", self.current_index.to_string()))?;
        let target = page
            .rows
            .get_mut(row)
            .and_then(|r| r.panels.get_mut(panel))
            .ok_or_else(|| PanelkitError::not_found("panel", format!("{row}:{panel}")))?;
        target.text = text.into();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.current_index = 0;
    }

    pub fn count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pulls an out-of-range cursor (e.g. from hand-edited storage) back into range.
    fn clamp_cursor(&mut self) {
        if self.current_index >= self.pages.len() {
            self.current_index = self.pages.len().saturating_sub(1);
        }
    }
}
