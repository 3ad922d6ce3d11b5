//! Stage failure descriptions and remediation hints.
//!
//! A `StageFailure` is the input to the self-heal decision; a
//! `RemediationHint` is its advisory output, passed to the agent's next
//! authoring request. The hint is advisory only: the hard guarantee of the
//! self-heal loop is the attempt bound, not the fix.

use serde::{Deserialize, Serialize};

use super::state::Stage;

/// Description of a failed stage, carried into self-healing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageFailure {
    /// Stage at which the failure occurred
    pub stage: Stage,
    /// Diagnostic text from the agent or timeout machinery
    pub diagnostic: String,
    /// Whether the stage exceeded its deadline rather than failing outright.
    /// Kept distinct so reporting can tell "broken" from "slow".
    pub timed_out: bool,
}

impl StageFailure {
    /// Failure from a stage that ran and reported a negative outcome.
    pub fn new(stage: Stage, diagnostic: impl Into<String>) -> Self {
        Self {
            stage,
            diagnostic: diagnostic.into(),
            timed_out: false,
        }
    }

    /// Failure from a stage that exceeded its deadline.
    pub fn timeout(stage: Stage, deadline_secs: u64) -> Self {
        Self {
            stage,
            diagnostic: format!("{} stage timed out after {}s", stage, deadline_secs),
            timed_out: true,
        }
    }
}

/// Classification of a stage failure, driving the remediation strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Unresolved runtime library, unbound variable, missing prerequisite
    MissingDependency,
    /// Quoting or validation-command syntax problem
    QuotingSyntax,
    /// Anything we could not classify
    Unknown,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingDependency => "missing_dependency",
            Self::QuotingSyntax => "quoting_syntax",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Advisory instruction handed to the agent when re-authoring a procedure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemediationHint {
    /// Failure class the hint was derived from
    pub class: FailureClass,
    /// Instruction for the authoring stage
    pub instruction: String,
    /// Concrete identifiers extracted from the diagnostic (library names, variables)
    pub identifiers: Vec<String>,
}

impl RemediationHint {
    pub fn new(class: FailureClass, instruction: impl Into<String>, identifiers: Vec<String>) -> Self {
        Self {
            class,
            instruction: instruction.into(),
            identifiers,
        }
    }
}
