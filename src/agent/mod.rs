//! Agent capability boundary.
//!
//! All intelligence (repository analysis, procedure authoring, static
//! checks, containerized execution, validation) happens behind the
//! `AgentCapability` trait. The orchestrator never depends on how that work
//! is done, only on the structured outcomes, so the whole capability can be
//! swapped for a scripted double in tests.

pub mod command;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{RemediationHint, ToolManifest, ToolSpec};
use crate::error::Result;

pub use command::CommandAgent;
pub use mock::MockAgent;

/// Structured outcome of a check, execute, or validate stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Whether the stage passed
    pub passed: bool,
    /// Combined output from the stage (lint output, execution logs, ...)
    pub output: String,
    /// Specific errors extracted from the output
    pub errors: Vec<String>,
}

impl StageReport {
    /// Create a passing report with output.
    pub fn pass(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
            errors: Vec::new(),
        }
    }

    /// Create a failing report with a single error.
    pub fn fail(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            passed: false,
            output: error.clone(),
            errors: vec![error],
        }
    }

    /// Create a failing report with full output and extracted errors.
    pub fn fail_with_output(output: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
            errors,
        }
    }

    /// Diagnostic text for failure routing: extracted errors if present,
    /// raw output otherwise.
    pub fn diagnostic(&self) -> String {
        if self.errors.is_empty() {
            self.output.clone()
        } else {
            self.errors.join("; ")
        }
    }
}

/// Request to analyze a tool's repository and requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub tool: ToolSpec,
}

/// Analysis result: the manifest plus free-form notes for authoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub manifest: ToolManifest,
    #[serde(default)]
    pub notes: String,
}

/// Request to author (or re-author) an installation procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRequest {
    pub tool: ToolSpec,
    pub manifest: ToolManifest,
    /// Self-heal hint from the previous attempt, if this is a retry
    #[serde(default)]
    pub remediation: Option<RemediationHint>,
    /// Diagnostic from the previous attempt, if this is a retry
    #[serde(default)]
    pub prior_diagnostic: Option<String>,
}

/// Authoring result: the complete installation procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub procedure_text: String,
}

/// Request to statically check a procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub tool_id: String,
    pub procedure_text: String,
}

/// Request to execute a procedure in an isolated environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub tool_id: String,
    pub procedure_text: String,
}

/// Request to validate an installed tool inside its environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub tool_id: String,
    /// Validation command, if the tool spec carries one
    #[serde(default)]
    pub validate_cmd: Option<String>,
}

/// The external capability that does the actual installation work.
///
/// Errors returned from check/execute/validate are treated by the pipeline
/// as stage failures (routed into self-healing), not crashes.
#[async_trait]
pub trait AgentCapability: Send + Sync {
    /// Discover what a tool needs; produces the manifest.
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse>;

    /// Author or repair an installation procedure.
    async fn author(&self, request: AuthorRequest) -> Result<AuthorResponse>;

    /// Statically check the procedure (syntax, lint).
    async fn check(&self, request: CheckRequest) -> Result<StageReport>;

    /// Execute the procedure in an isolated environment.
    async fn execute(&self, request: ExecuteRequest) -> Result<StageReport>;

    /// Validate the installed tool.
    async fn validate(&self, request: ValidateRequest) -> Result<StageReport>;
}
