//! Error types for the cost calculation module.

use thiserror::Error;

/// Cost calculation errors.
#[derive(Error, Debug)]
pub enum CostError {
    /// Model id is not a key of the price table
    #[error("unknown model: {model}. Available: {}", .available.join(", "))]
    UnknownModel {
        /// Requested model id
        model: String,
        /// Every model id configured in the price table
        available: Vec<String>,
    },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (usage files, metrics store)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl CostError {
    /// Check if this error comes from a model lookup.
    pub fn is_unknown_model(&self) -> bool {
        matches!(self, CostError::UnknownModel { .. })
    }

    /// Create a user-friendly message for this error.
    pub fn friendly_message(&self) -> String {
        match self {
            CostError::UnknownModel { model, available } => {
                if available.is_empty() {
                    format!("Model '{}' is not priced: the price table is empty.", model)
                } else {
                    format!(
                        "Model '{}' is not priced. Configured models: {}",
                        model,
                        available.join(", ")
                    )
                }
            }
            CostError::Io(e) => {
                let msg = e.to_string().to_lowercase();
                if msg.contains("permission") {
                    "Permission denied. Check file permissions.".to_string()
                } else if msg.contains("not found") || e.kind() == std::io::ErrorKind::NotFound {
                    "File or directory not found.".to_string()
                } else {
                    format!("File system error: {}", e)
                }
            }
            _ => format!("Error: {}", self),
        }
    }
}

/// Result type for cost operations.
pub type Result<T> = std::result::Result<T, CostError>;
