//! Platform paths for panelkit configuration and state.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/panelkit/          # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/panelkit/     # Data directory
//! └── state/                   # Session storage (one JSON file per key)
//!     ├── sessions.json
//!     └── current_session.json
//! ```

use std::path::PathBuf;

use panelkit_core::error::{PanelkitError, Result};

const APP_DIR: &str = "panelkit";

pub struct PanelkitPaths;

impl PanelkitPaths {
    /// `~/.config/panelkit` (or the platform equivalent).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| PanelkitError::config("Cannot find config directory"))
    }

    /// `~/.local/share/panelkit` (or the platform equivalent).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| PanelkitError::config("Cannot find data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Default directory for `JsonFileStorage`.
    pub fn state_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("state"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_nested_under_app_dir() {
        if let (Ok(config), Ok(state)) = (PanelkitPaths::config_file(), PanelkitPaths::state_dir()) {
            assert!(config.ends_with("panelkit/config.toml"));
            assert!(state.ends_with("panelkit/state"));
        }
    }
}
