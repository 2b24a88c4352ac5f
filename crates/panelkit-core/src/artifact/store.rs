//! Per-page artifact version store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::model::{ArtifactEntry, ArtifactVersion};
use super::record::ArtifactRecord;
use crate::error::{PanelkitError, Result};

/// Mapping from page index to that page's version history.
///
/// Entries are created lazily on the first successful generation for a page
/// and are never invalidated by page text edits. Iteration is in ascending
/// page index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactVersionStore {
    entries: BTreeMap<usize, ArtifactEntry>,
}

impl ArtifactVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly generated image for `page_index`.
    ///
    /// The first image for a page becomes version 1. Later images get
    /// `previous max + 1` and always become the current version. The entry's
    /// title is refreshed to `page_title`.
    pub fn append_version(
        &mut self,
        page_index: usize,
        page_title: impl Into<String>,
        image_reference: impl Into<String>,
    ) -> ArtifactVersion {
        self.append_version_at(page_index, page_title, image_reference, Utc::now())
    }

    /// Like [`append_version`](Self::append_version) with an explicit creation time.
    pub fn append_version_at(
        &mut self,
        page_index: usize,
        page_title: impl Into<String>,
        image_reference: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> ArtifactVersion {
        let page_title = page_title.into();
        let image_reference = image_reference.into();

        match self.entries.get_mut(&page_index) {
            Some(entry) => entry.push(page_title, image_reference, created_at).clone(),
            None => {
                let entry =
                    ArtifactEntry::first(page_index, page_title, image_reference, created_at);
                let version = entry.current().clone();
                self.entries.insert(page_index, entry);
                version
            }
        }
    }

    /// Points a page's current version at an older (or newer) version.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the page has no entry or `version_index` is out of range.
    pub fn select_version(&mut self, page_index: usize, version_index: usize) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&page_index)
            .ok_or_else(|| PanelkitError::not_found("artifact", page_index.to_string()))?;
        if entry.select(version_index) {
            Ok(())
        } else {
            Err(PanelkitError::not_found(
                "artifact version",
                format!("{page_index}:{version_index}"),
            ))
        }
    }

    pub fn get(&self, page_index: usize) -> Option<&ArtifactEntry> {
        self.entries.get(&page_index)
    }

    /// The selected version for a page, if any image was generated for it.
    pub fn get_current(&self, page_index: usize) -> Option<&ArtifactVersion> {
        self.entries.get(&page_index).map(ArtifactEntry::current)
    }

    pub fn has_any(&self, page_index: usize) -> bool {
        self.entries.contains_key(&page_index)
    }

    /// All entries in ascending page index.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &ArtifactEntry> {
        self.entries.values()
    }

    /// Entries for pages strictly before `page_index`, ascending.
    pub fn entries_before(
        &self,
        page_index: usize,
    ) -> impl DoubleEndedIterator<Item = &ArtifactEntry> {
        self.entries.range(..page_index).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'de> Deserialize<'de> for ArtifactVersionStore {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Option::<BTreeMap<usize, ArtifactRecord>>::deserialize(deserializer)?
            .unwrap_or_default();

        let mut entries = BTreeMap::new();
        for (page_index, record) in records {
            match record.normalize(Some(page_index)) {
                Some(entry) => {
                    entries.insert(page_index, entry);
                }
                None => {
                    tracing::warn!(page_index, "Dropping stored artifact entry with no versions");
                }
            }
        }
        Ok(Self { entries })
    }
}
