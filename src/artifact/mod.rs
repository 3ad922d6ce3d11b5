//! Filesystem artifact persistence.
//!
//! Everything produced during a run lands under
//! `<base>/runs/<run_id>/tools/<tool_id>/`: the authored procedure, the
//! manifest, stage reports, and the attempt trail. The run summary is
//! written once at `<base>/runs/<run_id>/summary.json` after every tool
//! is terminal.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{AttemptRecord, RunSummary};
use crate::error::{InstallrError, Result};

/// The artifact kinds a pipeline attempt can produce for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The authored installation procedure (executable)
    Script,
    /// The agent's analysis manifest
    Manifest,
    /// Static check report
    CheckReport,
    /// Execution stage output
    ExecutionLog,
    /// Validation stage output
    ValidationLog,
    /// Structured terminal outcome of the tool's last attempt
    Result,
}

impl ArtifactKind {
    /// File name within the tool's artifact directory.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Script => "install.sh",
            Self::Manifest => "manifest.json",
            Self::CheckReport => "check_report.json",
            Self::ExecutionLog => "execution.log",
            Self::ValidationLog => "validation.log",
            Self::Result => "result.json",
        }
    }
}

/// Store for per-run, per-tool artifacts.
pub struct ArtifactStore {
    base: PathBuf,
    keep_failed_attempts: bool,
}

impl ArtifactStore {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
            keep_failed_attempts: true,
        }
    }

    /// Control whether stage artifacts from failed attempts are kept.
    /// The attempt trail is always kept.
    pub fn with_keep_failed_attempts(mut self, keep: bool) -> Self {
        self.keep_failed_attempts = keep;
        self
    }

    /// Directory for a run.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base.join("runs").join(run_id)
    }

    /// Directory for one tool's artifacts within a run.
    pub fn tool_dir(&self, run_id: &str, tool_id: &str) -> PathBuf {
        self.run_dir(run_id).join("tools").join(tool_id)
    }

    /// Where the run summary lands.
    pub fn summary_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("summary.json")
    }

    /// Create the run directory. Run IDs are unique per invocation, so an
    /// existing directory means an ID collision and is an error.
    pub fn begin_run(&self, run_id: &str) -> Result<()> {
        let dir = self.run_dir(run_id);
        if dir.exists() {
            return Err(InstallrError::Artifact(format!(
                "run directory already exists: {}",
                dir.display()
            )));
        }
        fs::create_dir_all(dir.join("tools"))?;
        Ok(())
    }

    /// Persist one artifact for a tool. Saving the same kind again within
    /// a run replaces it (retries re-author the procedure).
    pub fn save(&self, run_id: &str, tool_id: &str, kind: ArtifactKind, content: &str) -> Result<PathBuf> {
        let dir = self.tool_dir(run_id, tool_id);
        fs::create_dir_all(&dir)?;

        let path = dir.join(kind.filename());
        fs::write(&path, content)?;

        if kind == ArtifactKind::Script {
            self.mark_executable(&path)?;
            let digest = hex::encode(Sha256::digest(content.as_bytes()));
            fs::write(dir.join("install.sh.sha256"), format!("{}  install.sh\n", digest))?;
        }

        debug!(run_id, tool_id, file = kind.filename(), "artifact saved");
        Ok(path)
    }

    #[cfg(unix)]
    fn mark_executable(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn mark_executable(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Append one attempt record to the tool's attempt trail.
    pub fn append_attempt(&self, run_id: &str, record: &AttemptRecord) -> Result<()> {
        let dir = self.tool_dir(run_id, &record.tool_id);
        fs::create_dir_all(&dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("attempts.jsonl"))?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Load the attempt trail for a tool.
    pub fn load_attempts(&self, run_id: &str, tool_id: &str) -> Result<Vec<AttemptRecord>> {
        let path = self.tool_dir(run_id, tool_id).join("attempts.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    /// Drop the stage artifacts of a failed attempt when configured to.
    /// The attempt trail survives either way.
    pub fn discard_attempt_artifacts(&self, run_id: &str, tool_id: &str) -> Result<()> {
        if self.keep_failed_attempts {
            return Ok(());
        }
        let dir = self.tool_dir(run_id, tool_id);
        for kind in [
            ArtifactKind::Script,
            ArtifactKind::CheckReport,
            ArtifactKind::ExecutionLog,
            ArtifactKind::ValidationLog,
        ] {
            let path = dir.join(kind.filename());
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        let sidecar = dir.join("install.sh.sha256");
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
        Ok(())
    }

    /// Write the run summary exactly once, after every tool is terminal.
    pub fn finalize_run(&self, summary: &RunSummary) -> Result<PathBuf> {
        if !summary.all_terminal() {
            return Err(InstallrError::InvalidState(format!(
                "run {} summarized before all tools reached a terminal state",
                summary.run_id
            )));
        }

        let path = self.summary_path(&summary.run_id);
        if path.exists() {
            return Err(InstallrError::InvalidState(format!(
                "summary already written for run {}",
                summary.run_id
            )));
        }

        fs::write(&path, serde_json::to_vec_pretty(summary)?)?;
        debug!(run_id = %summary.run_id, "run summary written");
        Ok(path)
    }
}
