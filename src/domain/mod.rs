//! Domain types for installr
//!
//! This module contains all core domain types:
//! - ToolSpec / ToolStatus: the backlog's view of a tool
//! - JobState / Stage: the per-tool pipeline state machine vocabulary
//! - AttemptRecord: audit trail of pipeline attempts
//! - StageFailure / FailureClass / RemediationHint: self-heal inputs and outputs
//! - ToolManifest: the agent's analysis of what a tool needs
//! - RunSummary / ToolOutcome: aggregate result of one orchestrator run

pub mod attempt;
pub mod failure;
pub mod manifest;
pub mod state;
pub mod summary;
pub mod tool;

pub use attempt::{AttemptOutcome, AttemptRecord};
pub use failure::{FailureClass, RemediationHint, StageFailure};
pub use manifest::ToolManifest;
pub use state::{JobState, Stage};
pub use summary::{RunSummary, RunTotals, ToolOutcome};
pub use tool::{ToolSpec, ToolStatus};
