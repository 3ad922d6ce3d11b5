//! Per-tool pipeline runner.
//!
//! Drives one tool through analyze, author, check, execute, and validate,
//! with the bounded self-heal loop routing remediable failures back to
//! authoring. The runner owns the tool's state transitions and audit trail.
//! It never touches the status store; write-back is the scheduler's job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{
    AgentCapability, AnalyzeRequest, AuthorRequest, CheckRequest, ExecuteRequest, StageReport,
    ValidateRequest,
};
use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::context::RunContext;
use crate::domain::{
    AttemptRecord, JobState, RemediationHint, Stage, StageFailure, ToolManifest, ToolOutcome,
    ToolSpec,
};
use crate::error::Result;
use crate::pipeline::heal::{self, HealDecision};

/// What one tool's pipeline produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Terminal state (Passed or Failed)
    pub final_state: JobState,
    /// Every attempt, in order
    pub attempts: Vec<AttemptRecord>,
    /// Diagnostic from the last failed attempt, if any
    pub last_diagnostic: Option<String>,
}

impl PipelineOutcome {
    fn passed(attempts: Vec<AttemptRecord>) -> Self {
        Self {
            final_state: JobState::Passed,
            attempts,
            last_diagnostic: None,
        }
    }

    fn failed(attempts: Vec<AttemptRecord>, diagnostic: String) -> Self {
        Self {
            final_state: JobState::Failed,
            attempts,
            last_diagnostic: Some(diagnostic),
        }
    }

    /// Attempts consumed.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// How a single stage call ended.
enum StageCall<T> {
    Completed(T),
    Failed(StageFailure),
    Cancelled,
}

/// Runs the full pipeline for one tool within a run.
pub struct PipelineRunner<A: AgentCapability> {
    agent: Arc<A>,
    artifacts: Arc<ArtifactStore>,
}

impl<A: AgentCapability> PipelineRunner<A> {
    pub fn new(agent: Arc<A>, artifacts: Arc<ArtifactStore>) -> Self {
        Self { agent, artifacts }
    }

    /// Drive the tool to a terminal state.
    ///
    /// Errors are infrastructure failures (artifact persistence); stage
    /// failures and timeouts are absorbed into the outcome instead.
    pub async fn run(
        &self,
        tool: &ToolSpec,
        ctx: &RunContext,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut manifest: Option<ToolManifest> = None;
        let mut remediation: Option<RemediationHint> = None;
        let mut prior_diagnostic: Option<String> = None;

        for attempt_number in 1..=ctx.max_attempts {
            let mut record = AttemptRecord::begin(&tool.id, attempt_number);
            info!(tool_id = %tool.id, attempt_number, "attempt started");

            let ended = self
                .run_attempt(tool, ctx, cancel, &mut record, &mut manifest, remediation.take(), prior_diagnostic.take())
                .await?;

            match ended {
                AttemptEnd::Passed => {
                    record.mark_passed();
                    self.artifacts.append_attempt(&ctx.run_id, &record)?;
                    attempts.push(record);
                    info!(tool_id = %tool.id, attempt_number, "tool passed");
                    return self.finish(tool, ctx, PipelineOutcome::passed(attempts));
                }
                AttemptEnd::Cancelled => {
                    record.mark_failed("run cancelled");
                    self.artifacts.append_attempt(&ctx.run_id, &record)?;
                    attempts.push(record);
                    warn!(tool_id = %tool.id, attempt_number, "attempt cancelled");
                    return self.finish(tool, ctx, PipelineOutcome::failed(attempts, "run cancelled".to_string()));
                }
                AttemptEnd::Failed(failure) => {
                    let diagnostic = failure.diagnostic.clone();

                    if !failure.stage.is_remediable() {
                        record.mark_failed(&diagnostic);
                        self.artifacts.append_attempt(&ctx.run_id, &record)?;
                        attempts.push(record);
                        warn!(tool_id = %tool.id, stage = %failure.stage, "unremediable stage failed");
                        return self.finish(tool, ctx, PipelineOutcome::failed(attempts, diagnostic));
                    }

                    record.advance(JobState::SelfHealing);
                    record.mark_failed(&diagnostic);
                    self.artifacts.append_attempt(&ctx.run_id, &record)?;
                    attempts.push(record);
                    self.artifacts.discard_attempt_artifacts(&ctx.run_id, &tool.id)?;

                    match heal::remediate(&failure, attempt_number, ctx.max_attempts) {
                        HealDecision::Retry(hint) => {
                            info!(
                                tool_id = %tool.id,
                                attempt_number,
                                class = %hint.class,
                                "self-heal retrying"
                            );
                            remediation = Some(hint);
                            prior_diagnostic = Some(diagnostic);
                        }
                        HealDecision::GiveUp => {
                            warn!(tool_id = %tool.id, attempt_number, "self-heal giving up");
                            return self.finish(tool, ctx, PipelineOutcome::failed(attempts, diagnostic));
                        }
                    }
                }
            }
        }

        // The loop always returns from the GiveUp arm before exhausting
        // the range; this is unreachable with max_attempts >= 1.
        self.finish(tool, ctx, PipelineOutcome::failed(attempts, "attempt bound exhausted".to_string()))
    }

    /// Persist the structured terminal outcome alongside the other
    /// artifacts, then hand the outcome back.
    fn finish(&self, tool: &ToolSpec, ctx: &RunContext, outcome: PipelineOutcome) -> Result<PipelineOutcome> {
        let result = ToolOutcome::new(
            &tool.id,
            outcome.final_state,
            outcome.attempt_count(),
            outcome.last_diagnostic.clone(),
        );
        self.artifacts.save(
            &ctx.run_id,
            &tool.id,
            ArtifactKind::Result,
            &serde_json::to_string_pretty(&result)?,
        )?;
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_attempt(
        &self,
        tool: &ToolSpec,
        ctx: &RunContext,
        cancel: &CancellationToken,
        record: &mut AttemptRecord,
        manifest: &mut Option<ToolManifest>,
        remediation: Option<RemediationHint>,
        prior_diagnostic: Option<String>,
    ) -> Result<AttemptEnd> {
        // Analysis runs once per run; retries reuse the manifest.
        let current_manifest = match manifest.as_ref() {
            Some(m) => m.clone(),
            None => {
                record.advance(Stage::Analyze.job_state());
                let call = self
                    .call(Stage::Analyze, ctx, cancel, self.agent.analyze(AnalyzeRequest { tool: tool.clone() }))
                    .await;
                let response = match call {
                    StageCall::Completed(r) => r,
                    StageCall::Failed(f) => return Ok(AttemptEnd::Failed(f)),
                    StageCall::Cancelled => return Ok(AttemptEnd::Cancelled),
                };
                self.artifacts.save(
                    &ctx.run_id,
                    &tool.id,
                    ArtifactKind::Manifest,
                    &serde_json::to_string_pretty(&response.manifest)?,
                )?;
                *manifest = Some(response.manifest.clone());
                response.manifest
            }
        };

        record.advance(Stage::Author.job_state());
        let call = self
            .call(
                Stage::Author,
                ctx,
                cancel,
                self.agent.author(AuthorRequest {
                    tool: tool.clone(),
                    manifest: current_manifest,
                    remediation,
                    prior_diagnostic,
                }),
            )
            .await;
        let authored = match call {
            StageCall::Completed(r) => r,
            StageCall::Failed(f) => return Ok(AttemptEnd::Failed(f)),
            StageCall::Cancelled => return Ok(AttemptEnd::Cancelled),
        };
        self.artifacts
            .save(&ctx.run_id, &tool.id, ArtifactKind::Script, &authored.procedure_text)?;

        record.advance(Stage::Check.job_state());
        let call = self
            .call(
                Stage::Check,
                ctx,
                cancel,
                self.agent.check(CheckRequest {
                    tool_id: tool.id.clone(),
                    procedure_text: authored.procedure_text.clone(),
                }),
            )
            .await;
        if let Some(end) = self
            .settle_report(Stage::Check, ArtifactKind::CheckReport, tool, ctx, call, true)?
        {
            return Ok(end);
        }

        record.advance(Stage::Execute.job_state());
        let call = self
            .call(
                Stage::Execute,
                ctx,
                cancel,
                self.agent.execute(ExecuteRequest {
                    tool_id: tool.id.clone(),
                    procedure_text: authored.procedure_text.clone(),
                }),
            )
            .await;
        if let Some(end) = self
            .settle_report(Stage::Execute, ArtifactKind::ExecutionLog, tool, ctx, call, false)?
        {
            return Ok(end);
        }

        record.advance(Stage::Validate.job_state());
        let call = self
            .call(
                Stage::Validate,
                ctx,
                cancel,
                self.agent.validate(ValidateRequest {
                    tool_id: tool.id.clone(),
                    validate_cmd: tool.known_metadata.get("validate_cmd").cloned(),
                }),
            )
            .await;
        if let Some(end) = self
            .settle_report(Stage::Validate, ArtifactKind::ValidationLog, tool, ctx, call, false)?
        {
            return Ok(end);
        }

        Ok(AttemptEnd::Passed)
    }

    /// Persist a report-producing stage's output and convert a negative
    /// report into a stage failure. Returns None when the stage passed.
    fn settle_report(
        &self,
        stage: Stage,
        kind: ArtifactKind,
        tool: &ToolSpec,
        ctx: &RunContext,
        call: StageCall<StageReport>,
        as_json: bool,
    ) -> Result<Option<AttemptEnd>> {
        let report = match call {
            StageCall::Completed(r) => r,
            StageCall::Failed(f) => return Ok(Some(AttemptEnd::Failed(f))),
            StageCall::Cancelled => return Ok(Some(AttemptEnd::Cancelled)),
        };

        let content = if as_json {
            serde_json::to_string_pretty(&report)?
        } else {
            report.output.clone()
        };
        self.artifacts.save(&ctx.run_id, &tool.id, kind, &content)?;

        if report.passed {
            Ok(None)
        } else {
            Ok(Some(AttemptEnd::Failed(StageFailure::new(stage, report.diagnostic()))))
        }
    }

    /// Run one agent call under the stage deadline and the run's
    /// cancellation token. Agent errors and timeouts both become stage
    /// failures.
    async fn call<T, Fut>(
        &self,
        stage: Stage,
        ctx: &RunContext,
        cancel: &CancellationToken,
        fut: Fut,
    ) -> StageCall<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let deadline: Duration = ctx.stage_timeouts.for_stage(stage);
        tokio::select! {
            _ = cancel.cancelled() => StageCall::Cancelled,
            outcome = tokio::time::timeout(deadline, fut) => match outcome {
                Err(_) => StageCall::Failed(StageFailure::timeout(stage, deadline.as_secs())),
                Ok(Ok(value)) => StageCall::Completed(value),
                Ok(Err(e)) => StageCall::Failed(StageFailure::new(stage, e.to_string())),
            },
        }
    }
}

/// How one attempt ended.
enum AttemptEnd {
    Passed,
    Failed(StageFailure),
    Cancelled,
}
