//! Error types for cachelab process-level operations.
//!
//! [`LabError`] covers what can go wrong outside the calculator itself:
//! locating configuration, preparing log directories, and reading input
//! files. Calculator failures live in `cachelab_cost::CostError`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`LabError`].
pub type Result<T> = std::result::Result<T, LabError>;

/// Error type for setup and I/O around the calculator.
///
/// No automatic retry: every error is surfaced to the caller with a clear
/// message, and [`LabError::guidance`] offers a next step where one exists.
#[derive(Debug, Error)]
pub enum LabError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file not found
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file could not be understood
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in cachelab or broken environment)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LabError {
    /// Create a ConfigNotFound error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigNotFound { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => Some(
                "Pass an existing YAML file to --pricing, or omit it to use the Bedrock defaults",
            ),
            Self::ConfigInvalid { .. } => {
                Some("Each model needs numeric input, output, cache_write and cache_read rates")
            }
            Self::DirectoryCreation { .. } => Some("Choose a writable directory with --log-dir"),
            Self::Io { .. } => Some("Check that the file exists and is readable"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_display() {
        let err = LabError::config_not_found("/tmp/prices.yaml");
        assert_eq!(err.to_string(), "Configuration not found at /tmp/prices.yaml");
        assert!(err.is_config_error());
        assert!(err.guidance().is_some());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = LabError::io("reading usage file", "/tmp/usage.jsonl", source);

        assert_eq!(err.to_string(), "I/O error reading usage file: /tmp/usage.jsonl");
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_internal_has_no_guidance() {
        let err = LabError::internal("HOME not set");
        assert_eq!(err.guidance(), None);
    }
}
