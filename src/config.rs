//! Configuration loading.
//!
//! Loaded from an explicit path, `.installr.yml` in the current directory,
//! or `~/.config/installr/installr.yml`, falling back to defaults. Every
//! section defaults independently so partial files are fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::StageTimeouts;
use crate::error::{InstallrError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracing filter override (e.g. "installr=debug")
    pub log_level: Option<String>,

    /// Backlog / status store settings
    pub status_store: StatusStoreConfig,

    /// Artifact storage settings
    pub artifacts: ArtifactsConfig,

    /// Pipeline policy (concurrency, retry bound)
    pub pipeline: PipelineConfig,

    /// Per-stage deadlines in seconds
    pub timeouts: TimeoutsConfig,

    /// External agent invocation
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusStoreConfig {
    /// Path to the JSON backlog file
    pub path: PathBuf,
}

impl Default for StatusStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("backlog.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Base directory; runs land under `<base>/runs/<run_id>/`
    pub base_dir: PathBuf,
    /// Keep artifacts from failed attempts for audit
    pub keep_failed_attempts: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("artifacts"),
            keep_failed_attempts: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum concurrently live pipeline runners
    pub concurrency_limit: usize,
    /// Total attempts per tool per run (2 self-heal retries by default)
    pub max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub analyze_secs: u64,
    pub author_secs: u64,
    pub check_secs: u64,
    pub execute_secs: u64,
    pub validate_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        let defaults = StageTimeouts::default();
        Self {
            analyze_secs: defaults.analyze.as_secs(),
            author_secs: defaults.author.as_secs(),
            check_secs: defaults.check.as_secs(),
            execute_secs: defaults.execute.as_secs(),
            validate_secs: defaults.validate.as_secs(),
        }
    }
}

impl TimeoutsConfig {
    /// Convert to runtime stage timeouts.
    pub fn to_stage_timeouts(&self) -> StageTimeouts {
        use std::time::Duration;
        StageTimeouts {
            analyze: Duration::from_secs(self.analyze_secs),
            author: Duration::from_secs(self.author_secs),
            check: Duration::from_secs(self.check_secs),
            execute: Duration::from_secs(self.execute_secs),
            validate: Duration::from_secs(self.validate_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Program invoked per stage; receives the stage name as its final
    /// argument, a request JSON on stdin, and must emit a response JSON.
    pub command: Option<String>,
    /// Extra arguments passed before the stage name
    pub args: Vec<String>,
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .installr.yml in current directory
    /// 3. ~/.config/installr/installr.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_config = PathBuf::from(".installr.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    tracing::info!("Loaded config from .installr.yml");
                    return Ok(config);
                }
                Err(e) => {
                    tracing::warn!("Failed to load .installr.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("installr").join("installr.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| InstallrError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.concurrency_limit, 5);
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.status_store.path, PathBuf::from("backlog.json"));
        assert!(config.artifacts.keep_failed_attempts);
        assert!(config.agent.command.is_none());
    }

    #[test]
    fn test_timeouts_config_round_trip() {
        let timeouts = TimeoutsConfig::default().to_stage_timeouts();
        assert_eq!(timeouts, StageTimeouts::default());
    }

    #[test]
    fn test_load_from_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("installr.yml");
        fs::write(
            &path,
            "pipeline:\n  concurrency_limit: 3\n  max_attempts: 2\ntimeouts:\n  execute_secs: 60\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.pipeline.concurrency_limit, 3);
        assert_eq!(config.pipeline.max_attempts, 2);
        assert_eq!(config.timeouts.execute_secs, 60);
        // Untouched sections keep defaults
        assert_eq!(config.timeouts.check_secs, TimeoutsConfig::default().check_secs);
        assert_eq!(config.status_store.path, PathBuf::from("backlog.json"));
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let result = Config::load_from_file(Path::new("/nonexistent/installr.yml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_malformed_file_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "pipeline: [not, a, map]").unwrap();
        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn test_agent_config_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("installr.yml");
        fs::write(&path, "agent:\n  command: agentd\n  args: [\"--profile\", \"ci\"]\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.agent.command.as_deref(), Some("agentd"));
        assert_eq!(config.agent.args, vec!["--profile", "ci"]);
    }
}
