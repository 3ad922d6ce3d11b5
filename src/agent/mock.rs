//! Scripted agent double for tests and dry runs.
//!
//! Stages pop pre-loaded reports in order and default to passing when their
//! queue is empty, so tests only script the interesting failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    AgentCapability, AnalyzeRequest, AnalyzeResponse, AuthorRequest, AuthorResponse, CheckRequest,
    ExecuteRequest, StageReport, ValidateRequest,
};
use crate::domain::ToolManifest;
use crate::error::{InstallrError, Result};

/// Scripted AgentCapability implementation.
#[derive(Default)]
pub struct MockAgent {
    check_reports: Mutex<VecDeque<StageReport>>,
    execute_reports: Mutex<HashMap<String, VecDeque<StageReport>>>,
    validate_reports: Mutex<VecDeque<StageReport>>,
    analyze_error: Option<String>,
    author_error: Option<String>,
    panic_on_execute: HashSet<String>,
    stage_delay: Duration,
    author_requests: Mutex<Vec<AuthorRequest>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl MockAgent {
    /// Agent where every stage passes on the first attempt.
    pub fn passing() -> Self {
        Self::default()
    }

    /// Queue reports for the static-check stage (popped in order, any tool).
    pub fn with_check_reports(self, reports: Vec<StageReport>) -> Self {
        *self.check_reports.lock().unwrap() = reports.into();
        self
    }

    /// Queue reports for the execute stage of one specific tool.
    pub fn with_execute_reports(self, tool_id: &str, reports: Vec<StageReport>) -> Self {
        self.execute_reports
            .lock()
            .unwrap()
            .insert(tool_id.to_string(), reports.into());
        self
    }

    /// Queue reports for the validate stage (popped in order, any tool).
    pub fn with_validate_reports(self, reports: Vec<StageReport>) -> Self {
        *self.validate_reports.lock().unwrap() = reports.into();
        self
    }

    /// Make analysis fail with the given error.
    pub fn with_analyze_error(mut self, error: &str) -> Self {
        self.analyze_error = Some(error.to_string());
        self
    }

    /// Make authoring fail with the given error.
    pub fn with_author_error(mut self, error: &str) -> Self {
        self.author_error = Some(error.to_string());
        self
    }

    /// Panic inside execute for the given tool (dispatch-boundary testing).
    pub fn with_panic_on_execute(mut self, tool_id: &str) -> Self {
        self.panic_on_execute.insert(tool_id.to_string());
        self
    }

    /// Sleep this long inside execute, making concurrency overlap observable.
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    /// All authoring requests seen so far (for asserting remediation hints).
    pub fn author_requests(&self) -> Vec<AuthorRequest> {
        self.author_requests.lock().unwrap().clone()
    }

    /// High-water mark of concurrently live execute calls.
    pub fn max_concurrent_executes(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentCapability for MockAgent {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
        if let Some(err) = &self.analyze_error {
            return Err(InstallrError::Agent(err.clone()));
        }
        Ok(AnalyzeResponse {
            manifest: ToolManifest::simple(&request.tool.id, "binary_release"),
            notes: format!("analyzed {}", request.tool.source_url),
        })
    }

    async fn author(&self, request: AuthorRequest) -> Result<AuthorResponse> {
        if let Some(err) = &self.author_error {
            return Err(InstallrError::Agent(err.clone()));
        }
        let tool_id = request.tool.id.clone();
        self.author_requests.lock().unwrap().push(request);
        Ok(AuthorResponse {
            procedure_text: format!(
                "#!/usr/bin/env bash\nset -euo pipefail\ninstall_{}() {{ :; }}\ninstall_{} \"$@\"\n",
                tool_id, tool_id
            ),
        })
    }

    async fn check(&self, request: CheckRequest) -> Result<StageReport> {
        let scripted = self.check_reports.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| StageReport::pass(format!("check ok for {}", request.tool_id))))
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<StageReport> {
        if self.panic_on_execute.contains(&request.tool_id) {
            panic!("scripted panic for {}", request.tool_id);
        }

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        if !self.stage_delay.is_zero() {
            tokio::time::sleep(self.stage_delay).await;
        }

        let scripted = {
            let mut map = self.execute_reports.lock().unwrap();
            map.get_mut(&request.tool_id).and_then(|q| q.pop_front())
        };

        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(scripted.unwrap_or_else(|| StageReport::pass(format!("installed {}", request.tool_id))))
    }

    async fn validate(&self, request: ValidateRequest) -> Result<StageReport> {
        let scripted = self.validate_reports.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| {
            StageReport::pass(format!(
                "validated {} with {}",
                request.tool_id,
                request.validate_cmd.as_deref().unwrap_or("--version")
            ))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ToolSpec;

    fn tool() -> ToolSpec {
        ToolSpec::from_source_url("https://github.com/BurntSushi/ripgrep")
    }

    #[tokio::test]
    async fn test_passing_agent_passes_all_stages() {
        let agent = MockAgent::passing();
        let tool = tool();

        let analysis = agent.analyze(AnalyzeRequest { tool: tool.clone() }).await.unwrap();
        assert_eq!(analysis.manifest.tool_id, "ripgrep");

        let authored = agent
            .author(AuthorRequest {
                manifest: analysis.manifest,
                tool,
                remediation: None,
                prior_diagnostic: None,
            })
            .await
            .unwrap();
        assert!(authored.procedure_text.starts_with("#!/usr/bin/env bash"));

        let check = agent
            .check(CheckRequest {
                tool_id: "ripgrep".to_string(),
                procedure_text: authored.procedure_text.clone(),
            })
            .await
            .unwrap();
        assert!(check.passed);

        let exec = agent
            .execute(ExecuteRequest {
                tool_id: "ripgrep".to_string(),
                procedure_text: authored.procedure_text,
            })
            .await
            .unwrap();
        assert!(exec.passed);

        let validation = agent
            .validate(ValidateRequest {
                tool_id: "ripgrep".to_string(),
                validate_cmd: Some("rg --version".to_string()),
            })
            .await
            .unwrap();
        assert!(validation.passed);
        assert!(validation.output.contains("rg --version"));
    }

    #[tokio::test]
    async fn test_scripted_execute_reports_pop_in_order() {
        let agent = MockAgent::passing().with_execute_reports(
            "ripgrep",
            vec![StageReport::fail("first failure"), StageReport::pass("ok")],
        );

        let request = ExecuteRequest {
            tool_id: "ripgrep".to_string(),
            procedure_text: String::new(),
        };

        let first = agent.execute(request.clone()).await.unwrap();
        assert!(!first.passed);
        let second = agent.execute(request.clone()).await.unwrap();
        assert!(second.passed);
        // Queue exhausted: defaults to pass
        let third = agent.execute(request).await.unwrap();
        assert!(third.passed);
    }

    #[tokio::test]
    async fn test_analyze_error_injection() {
        let agent = MockAgent::passing().with_analyze_error("repository unreachable");
        let result = agent.analyze(AnalyzeRequest { tool: tool() }).await;
        assert!(matches!(result, Err(InstallrError::Agent(_))));
    }

    #[tokio::test]
    async fn test_author_requests_are_recorded() {
        let agent = MockAgent::passing();
        let tool = tool();
        agent
            .author(AuthorRequest {
                manifest: ToolManifest::simple(&tool.id, "binary_release"),
                tool,
                remediation: None,
                prior_diagnostic: Some("earlier diagnostic".to_string()),
            })
            .await
            .unwrap();

        let seen = agent.author_requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prior_diagnostic.as_deref(), Some("earlier diagnostic"));
    }
}
