//! Artifact version model.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::record::ArtifactRecord;

/// One generated image for a page. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactVersion {
    /// 1-based, strictly increasing within an entry
    #[serde(alias = "version")]
    pub version_number: u32,
    /// URL (or data URL) of the generated image
    #[serde(alias = "imageUrl")]
    pub image_reference: String,
    #[serde(alias = "timestamp", deserialize_with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// The version history of one page.
///
/// Invariants (enforced by construction, fields are private):
/// - `versions` is never empty
/// - `versions[i].version_number == i + 1`
/// - `current_version_index < versions.len()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ArtifactRecord")]
pub struct ArtifactEntry {
    page_index: usize,
    page_title: String,
    current_version_index: usize,
    versions: Vec<ArtifactVersion>,
}

impl ArtifactEntry {
    /// Creates an entry holding a single version numbered 1.
    pub(crate) fn first(
        page_index: usize,
        page_title: String,
        image_reference: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            page_index,
            page_title,
            current_version_index: 0,
            versions: vec![ArtifactVersion {
                version_number: 1,
                image_reference,
                created_at,
            }],
        }
    }

    /// Builds an entry from already-stored versions, restoring the invariants.
    ///
    /// Versions are renumbered from 1 in stored order and an out-of-range
    /// selection is pulled back to the newest version. Returns `None` when
    /// there is nothing to keep.
    pub(crate) fn from_parts(
        page_index: usize,
        page_title: String,
        current_version_index: usize,
        mut versions: Vec<ArtifactVersion>,
    ) -> Option<Self> {
        if versions.is_empty() {
            return None;
        }
        for (i, version) in versions.iter_mut().enumerate() {
            version.version_number = (i + 1) as u32;
        }
        let current_version_index = if current_version_index < versions.len() {
            current_version_index
        } else {
            versions.len() - 1
        };
        Some(Self {
            page_index,
            page_title,
            current_version_index,
            versions,
        })
    }

    /// Appends a version numbered `previous max + 1` and makes it current.
    pub(crate) fn push(
        &mut self,
        page_title: String,
        image_reference: String,
        created_at: DateTime<Utc>,
    ) -> &ArtifactVersion {
        let version_number = self.latest().version_number + 1;
        self.versions.push(ArtifactVersion {
            version_number,
            image_reference,
            created_at,
        });
        self.current_version_index = self.versions.len() - 1;
        self.page_title = page_title;
        self.current()
    }

    pub(crate) fn select(&mut self, version_index: usize) -> bool {
        if version_index < self.versions.len() {
            self.current_version_index = version_index;
            true
        } else {
            false
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_title(&self) -> &str {
        &self.page_title
    }

    pub fn current_version_index(&self) -> usize {
        self.current_version_index
    }

    pub fn versions(&self) -> &[ArtifactVersion] {
        &self.versions
    }

    /// The selected version (not necessarily the newest).
    pub fn current(&self) -> &ArtifactVersion {
        &self.versions[self.current_version_index]
    }

    pub fn latest(&self) -> &ArtifactVersion {
        &self.versions[self.versions.len() - 1]
    }
}

/// Accepts RFC 3339 strings or epoch milliseconds.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    StoredTimestamp::deserialize(deserializer)?
        .into_datetime()
        .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
}

/// A timestamp as it may appear in storage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredTimestamp {
    Millis(i64),
    Text(DateTime<Utc>),
}

impl StoredTimestamp {
    pub(crate) fn into_datetime(self) -> Option<DateTime<Utc>> {
        match self {
            StoredTimestamp::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
            StoredTimestamp::Text(dt) => Some(dt),
        }
    }
}
