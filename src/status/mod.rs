//! Durable tool status tracking.
//!
//! The status store is the backlog: it survives across runs and is the
//! only place installation outcomes are written back to. Stores are
//! accessed through the `StatusStore` trait so the scheduler never knows
//! whether it is talking to a JSON file or an in-memory double.

pub mod json;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ToolSpec, ToolStatus};
use crate::error::Result;
use crate::id::tool_id_from_url;

pub use json::JsonStatusStore;
pub use memory::MemoryStatusStore;

/// One tool's row in the backlog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusRow {
    /// Stable tool identifier; derived from the URL when the backlog
    /// omits it
    #[serde(default)]
    pub tool_id: String,

    /// Where the tool lives
    pub source_url: String,

    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Last known status
    #[serde(default = "default_status")]
    pub status: ToolStatus,

    /// Last diagnostic or status message written back
    #[serde(default)]
    pub message: Option<String>,

    /// Pointer to this tool's artifact directory from its last passing run
    #[serde(default)]
    pub artifact_path: Option<String>,

    /// When the row was last written
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> ToolStatus {
    ToolStatus::Pending
}

impl StatusRow {
    /// Fresh pending row for a source URL.
    pub fn pending(source_url: &str) -> Self {
        Self {
            tool_id: tool_id_from_url(source_url),
            source_url: source_url.to_string(),
            display_name: None,
            status: ToolStatus::Pending,
            message: None,
            artifact_path: None,
            updated_at: None,
        }
    }

    /// Fill in the derived tool ID if the backlog row omitted it.
    pub fn normalize(mut self) -> Self {
        if self.tool_id.is_empty() {
            self.tool_id = tool_id_from_url(&self.source_url);
        }
        self
    }

    /// The immutable tool spec the pipeline works from.
    pub fn to_tool_spec(&self) -> ToolSpec {
        let mut spec = ToolSpec::from_source_url(&self.source_url);
        spec.id = self.tool_id.clone();
        if let Some(name) = &self.display_name {
            spec = spec.with_display_name(name);
        }
        spec
    }
}

/// Durable backlog of tools and their installation status.
///
/// `update_status` is an idempotent upsert: writing the same status twice
/// leaves the row in the same state.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Load every row in the backlog.
    async fn load_rows(&self) -> Result<Vec<StatusRow>>;

    /// Write a tool's status back, with an optional message and artifact
    /// pointer.
    async fn update_status(
        &self,
        tool_id: &str,
        status: ToolStatus,
        message: Option<&str>,
        artifact_path: Option<&str>,
    ) -> Result<()>;
}
