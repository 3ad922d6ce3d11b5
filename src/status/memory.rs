//! In-memory status store for tests and dry runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{StatusRow, StatusStore};
use crate::domain::ToolStatus;
use crate::error::{InstallrError, Result};

/// StatusStore double holding the backlog in memory.
///
/// Preserves insertion order on load and records every status write so
/// tests can assert on write-back sequences.
#[derive(Default)]
pub struct MemoryStatusStore {
    rows: RwLock<Vec<StatusRow>>,
    history: RwLock<Vec<(String, ToolStatus)>>,
    fail_updates: bool,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backlog.
    pub fn with_rows(self, rows: Vec<StatusRow>) -> Self {
        *self.rows.write().unwrap_or_else(|e| e.into_inner()) =
            rows.into_iter().map(StatusRow::normalize).collect();
        self
    }

    /// Make every update_status call fail (write-back resilience tests).
    pub fn with_failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    /// Snapshot of a single row.
    pub fn row(&self, tool_id: &str) -> Option<StatusRow> {
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|r| r.tool_id == tool_id)
            .cloned()
    }

    /// Every status written, in order.
    pub fn update_history(&self) -> Vec<(String, ToolStatus)> {
        self.history.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn load_rows(&self) -> Result<Vec<StatusRow>> {
        Ok(self.rows.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn update_status(
        &self,
        tool_id: &str,
        status: ToolStatus,
        message: Option<&str>,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        if self.fail_updates {
            return Err(InstallrError::StatusStore("scripted update failure".to_string()));
        }

        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let row = rows
            .iter_mut()
            .find(|r| r.tool_id == tool_id)
            .ok_or_else(|| InstallrError::ToolNotFound(tool_id.to_string()))?;

        row.status = status;
        row.message = message.map(String::from);
        if let Some(path) = artifact_path {
            row.artifact_path = Some(path.to_string());
        }
        row.updated_at = Some(Utc::now());

        self.history
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((tool_id.to_string(), status));
        Ok(())
    }
}
