//! Immutable per-run execution context.
//!
//! One `RunContext` exists per orchestrator invocation and is threaded
//! explicitly through scheduler, pipeline runner, and self-heal decisions,
//! never held as ambient global state.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::domain::Stage;
use crate::id::generate_run_id;

/// Per-stage deadlines.
///
/// Build-class stages (execute) get long deadlines; check-class stages get
/// short ones. A timed-out stage is treated as that stage's failure, never
/// as a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub analyze: Duration,
    pub author: Duration,
    pub check: Duration,
    pub execute: Duration,
    pub validate: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            analyze: Duration::from_secs(120),
            author: Duration::from_secs(300),
            check: Duration::from_secs(60),
            execute: Duration::from_secs(1800),
            validate: Duration::from_secs(120),
        }
    }
}

impl StageTimeouts {
    /// Deadline for a specific stage.
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Analyze => self.analyze,
            Stage::Author => self.author,
            Stage::Check => self.check,
            Stage::Execute => self.execute,
            Stage::Validate => self.validate,
        }
    }
}

/// Immutable identity and policy for one orchestrator invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Unique run identifier; collision across runs is a configuration error
    pub run_id: String,
    /// When this context was created
    pub created_at: DateTime<Utc>,
    /// Maximum concurrently live pipeline runners
    pub concurrency_limit: usize,
    /// Total attempts allowed per tool per run (initial attempt included)
    pub max_attempts: u32,
    /// Per-stage deadlines
    pub stage_timeouts: StageTimeouts,
}

impl RunContext {
    /// Create a context with a fresh run ID and default policy.
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            run_id: generate_run_id(),
            created_at: Utc::now(),
            concurrency_limit: concurrency_limit.max(1),
            max_attempts: 3,
            stage_timeouts: StageTimeouts::default(),
        }
    }

    /// Build a context from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            run_id: generate_run_id(),
            created_at: Utc::now(),
            concurrency_limit: config.pipeline.concurrency_limit.max(1),
            max_attempts: config.pipeline.max_attempts.max(1),
            stage_timeouts: config.timeouts.to_stage_timeouts(),
        }
    }

    /// Override the attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the stage timeouts.
    pub fn with_stage_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.stage_timeouts = timeouts;
        self
    }

    /// Override the run ID (tests and resumable tooling).
    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }
}
