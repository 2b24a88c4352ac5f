//! Application configuration loaded from `config.toml`.
//!
//! ```toml
//! [storage]
//! dir = "/home/me/.local/share/panelkit/state"
//! quota_bytes = 5242880
//!
//! [generation]
//! reference_capacity = 6
//! render_delay_ms = 300
//! step_delay_ms = 500
//!
//! [backend]
//! base_url = "http://localhost:5003/api"
//! timeout_secs = 120
//!
//! [defaults]
//! style = "doraemon"
//! language = "en"
//! page_count = 3
//! rows_per_page = 4
//! ```
//!
//! Every section and field is optional.

use std::path::{Path, PathBuf};

use panelkit_core::artifact::DEFAULT_REFERENCE_CAPACITY;
use panelkit_core::error::{PanelkitError, Result};
use panelkit_core::session::{
    DEFAULT_LANGUAGE, DEFAULT_PAGE_COUNT, DEFAULT_ROWS_PER_PAGE, DEFAULT_STYLE, SessionConfig,
};
use serde::{Deserialize, Serialize};

use crate::paths::PanelkitPaths;

/// Environment variable holding the generation backend credentials.
pub const API_KEY_ENV: &str = "PANELKIT_API_KEY";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5003/api";
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub backend: BackendConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Falls back to [`PanelkitPaths::state_dir`] when unset
    pub dir: Option<PathBuf>,
    /// 0 disables the quota
    pub quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// How many preceding pages are sent as references
    pub reference_capacity: usize,
    /// Pause after moving the cursor to a page, before requesting it
    pub render_delay_ms: u64,
    /// Pause between consecutive batch requests
    pub step_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            reference_capacity: DEFAULT_REFERENCE_CAPACITY,
            render_delay_ms: 300,
            step_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Settings given to newly created sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub style: String,
    pub language: String,
    pub page_count: u32,
    pub rows_per_page: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            style: DEFAULT_STYLE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            page_count: DEFAULT_PAGE_COUNT,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }
}

impl From<DefaultsConfig> for SessionConfig {
    fn from(defaults: DefaultsConfig) -> Self {
        SessionConfig {
            style: defaults.style,
            language: defaults.language,
            page_count: defaults.page_count,
            rows_per_page: defaults.rows_per_page,
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the default config file when `path` is `None`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed, or if the
    /// session defaults are out of range.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => PanelkitPaths::config_file()?,
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(PanelkitError::config(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let config = Self::from_toml(&content)
            .map_err(|e| PanelkitError::config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PanelkitError::config(e.to_string()))?;
        config
            .session_defaults()
            .validate()
            .map_err(|e| PanelkitError::config(format!("[defaults] {e}")))?;
        Ok(config)
    }

    pub fn session_defaults(&self) -> SessionConfig {
        self.defaults.clone().into()
    }

    /// The storage directory, resolving the platform default.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        match &self.storage.dir {
            Some(dir) => Ok(dir.clone()),
            None => PanelkitPaths::state_dir(),
        }
    }

    /// Credentials for the generation backend, read from the environment.
    pub fn api_key() -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_is_default() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.generation.reference_capacity, 6);
        assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.storage.quota_bytes, DEFAULT_QUOTA_BYTES);
        assert_eq!(config.defaults.style, "doraemon");
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
            [generation]
            step_delay_ms = 0

            [defaults]
            language = "ja"
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.step_delay_ms, 0);
        assert_eq!(config.generation.render_delay_ms, 300);
        assert_eq!(config.defaults.language, "ja");
        assert_eq!(config.defaults.page_count, 3);
    }

    #[test]
    fn test_out_of_range_defaults_are_rejected() {
        let err = AppConfig::from_toml("[defaults]\nrows_per_page = 9\n").unwrap_err();
        assert!(matches!(err, PanelkitError::Config(_)));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[storage\n").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(PanelkitError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(Some(&temp_dir.path().join("none.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_storage_dir_override() {
        let config = AppConfig::from_toml("[storage]\ndir = \"/tmp/pk\"\n").unwrap();
        assert_eq!(config.storage_dir().unwrap(), PathBuf::from("/tmp/pk"));
    }
}
