//! JSON-file backed status store.
//!
//! The backlog is a single JSON array of rows, read in full and rewritten
//! in full on every status update. A tokio mutex serializes writers so
//! concurrent runners cannot interleave read-modify-write cycles.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use super::{StatusRow, StatusStore};
use crate::domain::ToolStatus;
use crate::error::{InstallrError, Result};

pub struct JsonStatusStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStatusStore {
    /// Open a store backed by an existing backlog file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(InstallrError::StatusStore(format!(
                "backlog file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Create a new backlog file from rows, then open it.
    pub fn create(path: &Path, rows: Vec<StatusRow>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let rows: Vec<StatusRow> = rows.into_iter().map(StatusRow::normalize).collect();
        fs::write(path, serde_json::to_vec_pretty(&rows)?)?;
        Self::open(path)
    }

    fn read_rows(&self) -> Result<Vec<StatusRow>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            InstallrError::StatusStore(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let rows: Vec<StatusRow> = serde_json::from_str(&content).map_err(|e| {
            InstallrError::StatusStore(format!("malformed backlog {}: {}", self.path.display(), e))
        })?;
        Ok(rows.into_iter().map(StatusRow::normalize).collect())
    }

    fn write_rows(&self, rows: &[StatusRow]) -> Result<()> {
        // Write to a sibling temp file and rename so a crash mid-write
        // never truncates the backlog.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(rows)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for JsonStatusStore {
    async fn load_rows(&self) -> Result<Vec<StatusRow>> {
        self.read_rows()
    }

    async fn update_status(
        &self,
        tool_id: &str,
        status: ToolStatus,
        message: Option<&str>,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut rows = self.read_rows()?;
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

        self.write_rows(&rows)?;
        debug!(tool_id, %status, "status written back");
        Ok(())
    }
}
