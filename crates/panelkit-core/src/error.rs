//! Error types for Panelkit.

use thiserror::Error;

/// A shared error type for the entire Panelkit workspace.
///
/// Variants are typed so the workflow layer can pick user-facing messages
/// without string matching.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PanelkitError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Attempt to delete the only remaining session
    #[error("Cannot delete the last session '{id}'")]
    LastSession { id: String },

    /// Durable storage rejected a write because it is full
    #[error("Storage quota exceeded while writing '{key}': {message}")]
    StorageQuotaExceeded { key: String, message: String },

    /// The generation collaborator reported failure or was unreachable
    #[error("Generation failed{}: {message}", .page_index.map(|i| format!(" for page {}", i + 1)).unwrap_or_default())]
    GenerationFailed {
        page_index: Option<usize>,
        message: String,
    },

    /// Invalid user input (blank names, malformed page JSON, out-of-range config)
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PanelkitError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a GenerationFailed error
    pub fn generation_failed(page_index: Option<usize>, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            page_index,
            message: message.into(),
        }
    }

    /// Creates a StorageQuotaExceeded error
    pub fn quota_exceeded(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageQuotaExceeded {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a LastSession error
    pub fn is_last_session(&self) -> bool {
        matches!(self, Self::LastSession { .. })
    }

    /// Check if this is a StorageQuotaExceeded error
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::StorageQuotaExceeded { .. })
    }

    /// Check if this is a GenerationFailed error
    pub fn is_generation_failed(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PanelkitError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::FileTooLarge => {
                Self::quota_exceeded("", err.to_string())
            }
            kind => Self::Io {
                message: format!("{} (kind: {:?})", err, kind),
            },
        }
    }
}

impl From<serde_json::Error> for PanelkitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PanelkitError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PanelkitError>`.
pub type Result<T> = std::result::Result<T, PanelkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failed_message_is_one_based() {
        let err = PanelkitError::generation_failed(Some(2), "backend returned 500");
        assert_eq!(
            err.to_string(),
            "Generation failed for page 3: backend returned 500"
        );
        assert!(err.is_generation_failed());
    }

    #[test]
    fn test_storage_full_maps_to_quota() {
        let io = std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full");
        let err: PanelkitError = io.into();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_other_io_errors_stay_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: PanelkitError = io.into();
        assert!(matches!(err, PanelkitError::Io { .. }));
    }
}
