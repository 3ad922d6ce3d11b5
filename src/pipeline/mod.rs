//! Per-tool pipeline: the state machine runner and the self-heal policy.

pub mod heal;
pub mod runner;

pub use heal::{HealDecision, classify, remediate};
pub use runner::{PipelineOutcome, PipelineRunner};
