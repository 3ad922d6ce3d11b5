use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use installr::agent::{AgentCapability, CommandAgent, MockAgent};
use installr::artifact::ArtifactStore;
use installr::config::Config;
use installr::context::RunContext;
use installr::domain::{JobState, RunSummary, ToolStatus};
use installr::scheduler::Scheduler;
use installr::status::{JsonStatusStore, MemoryStatusStore, StatusRow, StatusStore};

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    let default_directive = if verbose { "installr=debug" } else { "installr=info" };
    let directive = config
        .log_level
        .clone()
        .unwrap_or_else(|| default_directive.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;
    setup_logging(&config, cli.is_verbose())?;

    match cli.command {
        Commands::Run {
            backlog,
            artifacts_dir,
            max_concurrent,
            max_attempts,
            dry_run,
        } => {
            handle_run(
                &config,
                backlog,
                artifacts_dir,
                max_concurrent,
                max_attempts,
                dry_run,
            )
            .await
        }
        Commands::Init { backlog, urls } => handle_init(&config, backlog, &urls),
        Commands::Status { backlog } => handle_status(&config, backlog).await,
    }
}

async fn handle_run(
    config: &Config,
    backlog: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    max_concurrent: Option<usize>,
    max_attempts: Option<u32>,
    dry_run: bool,
) -> Result<()> {
    let backlog_path = backlog.unwrap_or_else(|| config.status_store.path.clone());
    let artifacts_base = artifacts_dir.unwrap_or_else(|| config.artifacts.base_dir.clone());
    let artifacts = Arc::new(
        ArtifactStore::new(&artifacts_base)
            .with_keep_failed_attempts(config.artifacts.keep_failed_attempts),
    );

    let mut ctx = RunContext::from_config(config);
    if let Some(limit) = max_concurrent {
        ctx.concurrency_limit = limit.max(1);
    }
    if let Some(attempts) = max_attempts {
        ctx = ctx.with_max_attempts(attempts);
    }

    info!(run_id = %ctx.run_id, backlog = %backlog_path.display(), dry_run, "starting run");

    let summary = if dry_run {
        // Dry runs read the real backlog but keep every write in memory.
        let rows = JsonStatusStore::open(&backlog_path)?.load_rows().await?;
        let store = Arc::new(MemoryStatusStore::new().with_rows(rows));
        execute_run(Arc::new(MockAgent::passing()), store, artifacts, &ctx).await?
    } else {
        let agent = Arc::new(CommandAgent::from_config(&config.agent)?);
        let store = Arc::new(JsonStatusStore::open(&backlog_path)?);
        execute_run(agent, store, artifacts, &ctx).await?
    };

    print_summary(&summary);
    // A finished run exits 0 even when individual tools failed; the
    // summary and the backlog carry those outcomes.
    Ok(())
}

async fn execute_run<A, S>(
    agent: Arc<A>,
    store: Arc<S>,
    artifacts: Arc<ArtifactStore>,
    ctx: &RunContext,
) -> Result<RunSummary>
where
    A: AgentCapability + 'static,
    S: StatusStore + 'static,
{
    let scheduler = Scheduler::new(agent, store, artifacts);

    let cancel = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, draining run");
            cancel.cancel();
        }
    });

    Ok(scheduler.run_all(ctx).await?)
}

fn handle_init(config: &Config, backlog: Option<PathBuf>, urls: &[String]) -> Result<()> {
    let path = backlog.unwrap_or_else(|| config.status_store.path.clone());
    let rows: Vec<StatusRow> = urls.iter().map(|url| StatusRow::pending(url)).collect();
    let count = rows.len();
    JsonStatusStore::create(&path, rows)?;
    println!(
        "{} {} with {} tool(s)",
        "Created".green(),
        path.display(),
        count
    );
    Ok(())
}

async fn handle_status(config: &Config, backlog: Option<PathBuf>) -> Result<()> {
    let path = backlog.unwrap_or_else(|| config.status_store.path.clone());
    let store = JsonStatusStore::open(&path)?;
    let rows = store.load_rows().await?;

    println!("{} ({} tools)", "Backlog".bold(), rows.len());
    for row in &rows {
        println!(
            "  {:<24} {}  {}",
            row.tool_id,
            colored_status(row.status),
            row.message.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn colored_status(status: ToolStatus) -> ColoredString {
    match status {
        ToolStatus::Pending => status.to_string().yellow(),
        ToolStatus::Running => status.to_string().cyan(),
        ToolStatus::Passed => status.to_string().green(),
        ToolStatus::Failed => status.to_string().red(),
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{} {}", "Run".bold(), summary.run_id);
    for tool in &summary.tools {
        let state = match tool.final_state {
            JobState::Passed => "passed".green(),
            _ => "failed".red(),
        };
        let diagnostic = tool.last_diagnostic.as_deref().unwrap_or("");
        println!(
            "  {:<24} {}  attempts={}  {}",
            tool.tool_id, state, tool.attempts, diagnostic
        );
    }
    println!(
        "{} dispatched={} passed={} failed={}",
        "Totals:".bold(),
        summary.totals.dispatched,
        summary.totals.passed,
        summary.totals.failed
    );
}
