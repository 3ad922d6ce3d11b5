//! Error types for installr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in installr
#[derive(Debug, Error)]
pub enum InstallrError {
    /// Tool not found in the status store
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid state transition or contract violation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Status store read/write error
    #[error("Status store error: {0}")]
    StatusStore(String),

    /// Artifact persistence error
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Agent capability error (analysis, authoring, checks, execution)
    #[error("Agent error: {0}")]
    Agent(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for installr operations
pub type Result<T> = std::result::Result<T, InstallrError>;
