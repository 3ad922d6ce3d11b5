//! Run-level orchestration.
//!
//! The scheduler loads the backlog, dispatches one pipeline task per
//! eligible tool under a semaphore admission gate, contains per-tool
//! panics at the dispatch boundary, writes statuses back as tools finish,
//! and assembles the run summary exactly once after every dispatched tool
//! is terminal.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::agent::AgentCapability;
use crate::artifact::ArtifactStore;
use crate::context::RunContext;
use crate::domain::{JobState, RunSummary, ToolOutcome, ToolSpec, ToolStatus};
use crate::error::Result;
use crate::pipeline::{PipelineOutcome, PipelineRunner};
use crate::status::StatusStore;

/// Orchestrates one run across the whole backlog.
pub struct Scheduler<A: AgentCapability, S: StatusStore> {
    agent: Arc<A>,
    status: Arc<S>,
    artifacts: Arc<ArtifactStore>,
    cancel: CancellationToken,
}

impl<A, S> Scheduler<A, S>
where
    A: AgentCapability + 'static,
    S: StatusStore + 'static,
{
    pub fn new(agent: Arc<A>, status: Arc<S>, artifacts: Arc<ArtifactStore>) -> Self {
        Self {
            agent,
            status,
            artifacts,
            cancel: CancellationToken::new(),
        }
    }

    /// Token for external shutdown (signal handlers).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every eligible tool in the backlog and return the summary.
    ///
    /// An unreadable backlog is fatal. Per-tool failures, panics, and
    /// status write-back failures are not: they degrade that tool's
    /// outcome and the run carries on.
    pub async fn run_all(&self, ctx: &RunContext) -> Result<RunSummary> {
        let rows = self.status.load_rows().await?;
        let eligible: Vec<ToolSpec> = rows
            .iter()
            .filter(|r| r.status.is_eligible())
            .map(|r| r.to_tool_spec())
            .collect();

        info!(
            run_id = %ctx.run_id,
            backlog = rows.len(),
            eligible = eligible.len(),
            concurrency_limit = ctx.concurrency_limit,
            "run starting"
        );

        self.artifacts.begin_run(&ctx.run_id)?;

        let semaphore = Arc::new(Semaphore::new(ctx.concurrency_limit));
        let runner = Arc::new(PipelineRunner::new(
            Arc::clone(&self.agent),
            Arc::clone(&self.artifacts),
        ));

        let mut tasks: JoinSet<ToolOutcome> = JoinSet::new();
        for tool in &eligible {
            let tool = tool.clone();
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&runner);
            let status = Arc::clone(&self.status);
            let artifacts = Arc::clone(&self.artifacts);
            let cancel = self.cancel.clone();

            tasks.spawn(async move {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let _permit = match permit {
                    Some(p) => p,
                    None => {
                        return ToolOutcome::new(&tool.id, JobState::Failed, 0, Some("run cancelled".to_string()));
                    }
                };

                if let Err(e) = status
                    .update_status(&tool.id, ToolStatus::Running, Some("installation started"), None)
                    .await
                {
                    warn!(tool_id = %tool.id, error = %e, "running status write-back failed");
                }

                let outcome = match AssertUnwindSafe(runner.run(&tool, &ctx, &cancel))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        error!(tool_id = %tool.id, error = %e, "pipeline infrastructure error");
                        PipelineOutcome {
                            final_state: JobState::Failed,
                            attempts: Vec::new(),
                            last_diagnostic: Some(format!("internal error: {}", e)),
                        }
                    }
                    Err(_) => {
                        error!(tool_id = %tool.id, "pipeline panicked");
                        PipelineOutcome {
                            final_state: JobState::Failed,
                            attempts: Vec::new(),
                            last_diagnostic: Some("internal error: pipeline panicked".to_string()),
                        }
                    }
                };

                write_back(&*status, &*artifacts, &ctx, &tool, &outcome).await;

                ToolOutcome::new(
                    &tool.id,
                    outcome.final_state,
                    outcome.attempt_count(),
                    outcome.last_diagnostic.clone(),
                )
            });
        }

        let mut finished: Vec<ToolOutcome> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => finished.push(outcome),
                Err(e) => error!(error = %e, "pipeline task join failed"),
            }
        }

        // Report in backlog order, not completion order.
        finished.sort_by_key(|outcome| {
            eligible
                .iter()
                .position(|t| t.id == outcome.tool_id)
                .unwrap_or(usize::MAX)
        });

        let summary = RunSummary::assemble(&ctx.run_id, ctx.created_at, finished);
        let path = self.artifacts.finalize_run(&summary)?;
        info!(
            run_id = %ctx.run_id,
            dispatched = summary.totals.dispatched,
            passed = summary.totals.passed,
            failed = summary.totals.failed,
            summary = %path.display(),
            "run finished"
        );
        Ok(summary)
    }
}

/// Write a tool's terminal status back to the backlog. Failures are logged
/// and swallowed so one store hiccup cannot sink the run.
async fn write_back<S: StatusStore>(
    status: &S,
    artifacts: &ArtifactStore,
    ctx: &RunContext,
    tool: &ToolSpec,
    outcome: &PipelineOutcome,
) {
    let result = match outcome.final_state {
        JobState::Passed => {
            let pointer = artifacts.tool_dir(&ctx.run_id, &tool.id).display().to_string();
            status
                .update_status(
                    &tool.id,
                    ToolStatus::Passed,
                    Some("installed and validated"),
                    Some(&pointer),
                )
                .await
        }
        _ => {
            status
                .update_status(
                    &tool.id,
                    ToolStatus::Failed,
                    outcome.last_diagnostic.as_deref(),
                    None,
                )
                .await
        }
    };

    if let Err(e) = result {
        warn!(tool_id = %tool.id, error = %e, "terminal status write-back failed");
    }
}
