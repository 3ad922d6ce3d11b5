//! Run summary aggregation.
//!
//! The `RunSummary` is the single source of truth for what a run did. It is
//! assembled once, after every dispatched tool has reached a terminal state,
//! and written exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::JobState;

/// Final outcome for one tool within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Tool identifier
    pub tool_id: String,
    /// Terminal state the tool reached
    pub final_state: JobState,
    /// Number of attempts consumed
    pub attempts: u32,
    /// Diagnostic from the last attempt, if any
    pub last_diagnostic: Option<String>,
}

impl ToolOutcome {
    pub fn new(tool_id: &str, final_state: JobState, attempts: u32, last_diagnostic: Option<String>) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            final_state,
            attempts,
            last_diagnostic,
        }
    }
}

/// Aggregate counters across all dispatched tools.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunTotals {
    pub dispatched: u32,
    pub passed: u32,
    pub failed: u32,
}

/// Write-once aggregate result of one orchestrator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier (unique per invocation)
    pub run_id: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub ended_at: DateTime<Utc>,
    /// One entry per dispatched tool
    pub tools: Vec<ToolOutcome>,
    /// Aggregate counters
    pub totals: RunTotals,
}

impl RunSummary {
    /// Assemble a summary from per-tool outcomes.
    ///
    /// Callers must only invoke this after every dispatched tool reached a
    /// terminal state; `ArtifactStore::finalize_run` re-checks this before
    /// persisting.
    pub fn assemble(run_id: &str, started_at: DateTime<Utc>, tools: Vec<ToolOutcome>) -> Self {
        let totals = RunTotals {
            dispatched: tools.len() as u32,
            passed: tools.iter().filter(|t| t.final_state == JobState::Passed).count() as u32,
            failed: tools.iter().filter(|t| t.final_state == JobState::Failed).count() as u32,
        };
        Self {
            run_id: run_id.to_string(),
            started_at,
            ended_at: Utc::now(),
            tools,
            totals,
        }
    }

    /// Look up the outcome for a specific tool.
    pub fn outcome_for(&self, tool_id: &str) -> Option<&ToolOutcome> {
        self.tools.iter().find(|t| t.tool_id == tool_id)
    }

    /// Whether every entry is terminal.
    pub fn all_terminal(&self) -> bool {
        self.tools.iter().all(|t| t.final_state.is_terminal())
    }
}
