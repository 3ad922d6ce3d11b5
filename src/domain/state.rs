//! Pipeline state machine vocabulary.
//!
//! A tool moves through `JobState`s in strict order; the only backward edge
//! is the bounded `SelfHealing -> Authoring` retry. `Stage` names the five
//! agent-facing operations that the states drive.

use serde::{Deserialize, Serialize};

/// Live state of one tool's pipeline within a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Dispatched but not yet admitted by the concurrency gate
    Queued,
    /// Agent is analyzing the tool's repository and requirements
    Analyzing,
    /// Agent is authoring (or re-authoring) the installation procedure
    Authoring,
    /// Procedure is being statically checked
    StaticChecking,
    /// Procedure is executing in an isolated environment
    Executing,
    /// A failure is being classified and a retry decision made
    SelfHealing,
    /// Installation is being validated inside the environment
    Validating,
    /// Terminal: installed and validated
    Passed,
    /// Terminal: gave up on this tool for this run
    Failed,
}

impl JobState {
    /// Check if this state is terminal (no further work scheduled this run).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Analyzing => "analyzing",
            Self::Authoring => "authoring",
            Self::StaticChecking => "static_checking",
            Self::Executing => "executing",
            Self::SelfHealing => "self_healing",
            Self::Validating => "validating",
            Self::Passed => "passed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// The five agent-facing pipeline operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analyze,
    Author,
    Check,
    Execute,
    Validate,
}

impl Stage {
    /// The JobState a tool is in while this stage runs.
    pub fn job_state(&self) -> JobState {
        match self {
            Self::Analyze => JobState::Analyzing,
            Self::Author => JobState::Authoring,
            Self::Check => JobState::StaticChecking,
            Self::Execute => JobState::Executing,
            Self::Validate => JobState::Validating,
        }
    }

    /// Whether a failure at this stage routes into self-healing.
    ///
    /// Analysis and authoring failures have no remediation path and fail
    /// the tool directly.
    pub fn is_remediable(&self) -> bool {
        matches!(self, Self::Check | Self::Execute | Self::Validate)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Analyze => "analyze",
            Self::Author => "author",
            Self::Check => "check",
            Self::Execute => "execute",
            Self::Validate => "validate",
        };
        write!(f, "{}", s)
    }
}
