//! Agent capability backed by an external command.
//!
//! Each stage spawns the configured program with the stage name as its final
//! argument, writes the request JSON to stdin, and parses the response JSON
//! from stdout. A non-zero exit is surfaced as an agent error; the pipeline
//! decides whether that fails the tool or routes into self-healing.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{
    AgentCapability, AnalyzeRequest, AnalyzeResponse, AuthorRequest, AuthorResponse, CheckRequest,
    ExecuteRequest, StageReport, ValidateRequest,
};
use crate::config::AgentConfig;
use crate::error::{InstallrError, Result};

/// AgentCapability implementation that shells out per stage.
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Build from the agent section of the configuration.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let program = config
            .command
            .as_deref()
            .ok_or_else(|| InstallrError::Config("agent.command is not set".to_string()))?;
        Ok(Self::new(program, config.args.clone()))
    }

    async fn invoke<Req, Resp>(&self, stage: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;
        debug!(program = %self.program, stage, "invoking agent command");

        // Stage deadlines and run cancellation drop this future mid-flight;
        // the agent process must not outlive it.
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(stage)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InstallrError::Agent(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| InstallrError::Agent(format!("agent process failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InstallrError::Agent(format!(
                "{} stage exited with {}: {}",
                stage,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            InstallrError::Agent(format!("{} stage produced unparseable response: {}", stage, e))
        })
    }
}

#[async_trait]
impl AgentCapability for CommandAgent {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
        self.invoke("analyze", &request).await
    }

    async fn author(&self, request: AuthorRequest) -> Result<AuthorResponse> {
        self.invoke("author", &request).await
    }

    async fn check(&self, request: CheckRequest) -> Result<StageReport> {
        self.invoke("check", &request).await
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<StageReport> {
        self.invoke("execute", &request).await
    }

    async fn validate(&self, request: ValidateRequest) -> Result<StageReport> {
        self.invoke("validate", &request).await
    }
}
