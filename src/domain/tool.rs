//! Tool specification and backlog status.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::tool_id_from_url;

/// Last known status of a tool in the status store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// Never processed
    Pending,
    /// A runner is currently working on it
    Running,
    /// Installed and validated
    Passed,
    /// Processing ended in failure
    Failed,
}

impl ToolStatus {
    /// Whether a tool with this status should be picked up by the scheduler.
    ///
    /// Previously failed tools are intentionally eligible again: this is the
    /// across-run reprocessing mechanism, separate from in-run self-heal.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Immutable specification of a tool to be installed.
///
/// Created when read from the status store; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSpec {
    /// Stable identifier, derived from the source URL unless supplied
    pub id: String,

    /// Where the tool lives (typically a repository URL)
    pub source_url: String,

    /// Human-readable name for logs and summaries
    pub display_name: String,

    /// Metadata already known before analysis (version pins, validate command, ...)
    #[serde(default)]
    pub known_metadata: HashMap<String, String>,
}

impl ToolSpec {
    /// Create a spec from a source URL, deriving the ID and display name.
    pub fn from_source_url(source_url: &str) -> Self {
        let id = tool_id_from_url(source_url);
        Self {
            display_name: id.clone(),
            id,
            source_url: source_url.to_string(),
            known_metadata: HashMap::new(),
        }
    }

    /// Override the display name.
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    /// Attach a known metadata entry.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.known_metadata.insert(key.to_string(), value.to_string());
        self
    }
}
