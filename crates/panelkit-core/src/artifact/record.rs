//! Stored shapes of an artifact entry.
//!
//! Older data stored a single image per page (`imageReference` + `timestamp`,
//! or `imageUrl` in the earliest format). Current data stores a `versions`
//! array. Every read goes through [`ArtifactRecord::normalize`], so the rest
//! of the crate only ever sees [`ArtifactEntry`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::model::{ArtifactEntry, ArtifactVersion, StoredTimestamp};

/// An artifact entry exactly as found in storage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArtifactRecord {
    Versioned(VersionedRecord),
    Legacy(LegacyRecord),
}

/// Current shape: a version history with a selected version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord {
    #[serde(default)]
    pub page_index: Option<usize>,
    #[serde(default)]
    pub page_title: String,
    #[serde(default, alias = "currentVersion")]
    pub current_version_index: Option<usize>,
    pub versions: Vec<ArtifactVersion>,
}

/// Legacy shape: one bare image, no history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord {
    #[serde(default)]
    pub page_index: Option<usize>,
    #[serde(default)]
    pub page_title: String,
    #[serde(alias = "imageUrl")]
    pub image_reference: String,
    #[serde(default)]
    timestamp: Option<StoredTimestamp>,
}

impl ArtifactRecord {
    /// Converts any stored shape into a well-formed entry.
    ///
    /// `page_index` overrides the index recorded inside the entry (the key of
    /// the enclosing map is authoritative). A legacy record becomes a single
    /// version numbered 1 with `current_version_index = 0`; a legacy record
    /// without a timestamp gets the Unix epoch. Returns `None` for a versioned
    /// record with an empty history.
    pub fn normalize(self, page_index: Option<usize>) -> Option<ArtifactEntry> {
        match self {
            ArtifactRecord::Versioned(record) => ArtifactEntry::from_parts(
                page_index.or(record.page_index).unwrap_or_default(),
                record.page_title,
                record.current_version_index.unwrap_or_default(),
                record.versions,
            ),
            ArtifactRecord::Legacy(record) => {
                let created_at = record
                    .timestamp
                    .and_then(StoredTimestamp::into_datetime)
                    .unwrap_or_else(DateTime::<Utc>::default);
                Some(ArtifactEntry::first(
                    page_index.or(record.page_index).unwrap_or_default(),
                    record.page_title,
                    record.image_reference,
                    created_at,
                ))
            }
        }
    }
}

impl TryFrom<ArtifactRecord> for ArtifactEntry {
    type Error = String;

    fn try_from(record: ArtifactRecord) -> Result<Self, Self::Error> {
        record
            .normalize(None)
            .ok_or_else(|| "artifact entry has no versions".to_string())
    }
}
