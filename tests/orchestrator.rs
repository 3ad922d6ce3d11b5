//! End-to-end orchestration tests over the public API: scripted agent,
//! in-memory and file-backed backlogs, real artifact directories.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use installr::agent::{MockAgent, StageReport};
use installr::artifact::ArtifactStore;
use installr::context::RunContext;
use installr::domain::{FailureClass, JobState, ToolSpec, ToolStatus};
use installr::pipeline::PipelineRunner;
use installr::scheduler::Scheduler;
use installr::status::{JsonStatusStore, MemoryStatusStore, StatusRow, StatusStore};

fn backlog(urls: &[&str]) -> Vec<StatusRow> {
    urls.iter().map(|u| StatusRow::pending(u)).collect()
}

#[tokio::test]
async fn clean_run_passes_and_writes_everything_back() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(MemoryStatusStore::new().with_rows(backlog(&[
        "https://github.com/BurntSushi/ripgrep",
        "https://github.com/sharkdp/bat",
        "https://github.com/junegunn/fzf",
    ])));
    let artifacts = Arc::new(ArtifactStore::new(temp.path()));
    let scheduler = Scheduler::new(Arc::new(MockAgent::passing()), Arc::clone(&store), Arc::clone(&artifacts));

    let ctx = RunContext::new(3);
    let summary = scheduler.run_all(&ctx).await.unwrap();

    assert_eq!(summary.totals.dispatched, 3);
    assert_eq!(summary.totals.passed, 3);
    assert_eq!(summary.totals.failed, 0);

    // Summary on disk, exactly where the store says it is
    let summary_path = artifacts.summary_path(&ctx.run_id);
    assert!(summary_path.exists());

    // Per-tool artifact layout
    for tool in ["ripgrep", "bat", "fzf"] {
        let dir = artifacts.tool_dir(&ctx.run_id, tool);
        assert!(dir.join("install.sh").exists(), "missing script for {}", tool);
        assert!(dir.join("install.sh.sha256").exists());
        assert!(dir.join("manifest.json").exists());
        assert!(dir.join("attempts.jsonl").exists());

        let row = store.row(tool).unwrap();
        assert_eq!(row.status, ToolStatus::Passed);
        assert!(row.artifact_path.as_ref().unwrap().ends_with(&format!("tools/{}", tool)));
    }
}

#[tokio::test]
async fn failure_self_heals_with_hint_and_passes() {
    let temp = TempDir::new().unwrap();
    let agent = Arc::new(MockAgent::passing().with_execute_reports(
        "ripgrep",
        vec![StageReport::fail(
            "rg: error while loading shared libraries: libpcre2-8.so.0: cannot open shared object file",
        )],
    ));
    let store = Arc::new(
        MemoryStatusStore::new().with_rows(backlog(&["https://github.com/BurntSushi/ripgrep"])),
    );
    let artifacts = Arc::new(ArtifactStore::new(temp.path()));
    let scheduler = Scheduler::new(Arc::clone(&agent), Arc::clone(&store), Arc::clone(&artifacts));

    let ctx = RunContext::new(1);
    let summary = scheduler.run_all(&ctx).await.unwrap();

    let outcome = summary.outcome_for("ripgrep").unwrap();
    assert_eq!(outcome.final_state, JobState::Passed);
    assert_eq!(outcome.attempts, 2);

    // Second authoring request carried the classified hint
    let requests = agent.author_requests();
    assert_eq!(requests.len(), 2);
    let hint = requests[1].remediation.as_ref().unwrap();
    assert_eq!(hint.class, FailureClass::MissingDependency);
    assert_eq!(hint.identifiers, vec!["libpcre2-8.so.0"]);

    // Attempt trail shows the failed first attempt
    let trail = artifacts.load_attempts(&ctx.run_id, "ripgrep").unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].stage_reached, JobState::SelfHealing);
    assert!(trail[0].diagnostic_summary.as_ref().unwrap().contains("shared libraries"));
}

#[tokio::test]
async fn attempt_bound_is_respected_and_failure_recorded() {
    let temp = TempDir::new().unwrap();
    let agent = MockAgent::passing().with_execute_reports(
        "ripgrep",
        vec![
            StageReport::fail("make: *** Error 2"),
            StageReport::fail("make: *** Error 2"),
            StageReport::fail("make: *** Error 2"),
            StageReport::fail("make: *** Error 2"),
        ],
    );
    let store = Arc::new(
        MemoryStatusStore::new().with_rows(backlog(&["https://github.com/BurntSushi/ripgrep"])),
    );
    let artifacts = Arc::new(ArtifactStore::new(temp.path()));
    let scheduler = Scheduler::new(Arc::new(agent), Arc::clone(&store), artifacts);

    let ctx = RunContext::new(1).with_max_attempts(3);
    let summary = scheduler.run_all(&ctx).await.unwrap();

    let outcome = summary.outcome_for("ripgrep").unwrap();
    assert_eq!(outcome.final_state, JobState::Failed);
    assert_eq!(outcome.attempts, 3);

    let row = store.row("ripgrep").unwrap();
    assert_eq!(row.status, ToolStatus::Failed);
    assert!(row.message.as_ref().unwrap().contains("Error 2"));
}

#[tokio::test]
async fn rerun_skips_passed_and_retries_failed() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(MemoryStatusStore::new().with_rows(backlog(&[
        "https://github.com/BurntSushi/ripgrep",
        "https://github.com/sharkdp/bat",
    ])));
    let artifacts = Arc::new(ArtifactStore::new(temp.path()));

    // First run: bat exhausts its attempts and fails
    let first_agent = MockAgent::passing().with_execute_reports(
        "bat",
        vec![
            StageReport::fail("exit 1"),
            StageReport::fail("exit 1"),
            StageReport::fail("exit 1"),
        ],
    );
    let scheduler = Scheduler::new(Arc::new(first_agent), Arc::clone(&store), Arc::clone(&artifacts));
    let first = scheduler.run_all(&RunContext::new(2)).await.unwrap();
    assert_eq!(first.totals.passed, 1);
    assert_eq!(first.totals.failed, 1);

    // Second run: only bat is eligible, and this time it installs
    let scheduler = Scheduler::new(Arc::new(MockAgent::passing()), Arc::clone(&store), artifacts);
    let second = scheduler.run_all(&RunContext::new(2)).await.unwrap();

    assert_eq!(second.totals.dispatched, 1);
    assert!(second.outcome_for("ripgrep").is_none());
    assert_eq!(second.outcome_for("bat").unwrap().final_state, JobState::Passed);
    assert_eq!(store.row("bat").unwrap().status, ToolStatus::Passed);
}

#[tokio::test]
async fn concurrency_limit_holds_under_load() {
    let temp = TempDir::new().unwrap();
    let urls: Vec<String> = (0..10).map(|i| format!("https://github.com/acme/tool-{}", i)).collect();
    let rows: Vec<StatusRow> = urls.iter().map(|u| StatusRow::pending(u)).collect();

    let agent = Arc::new(MockAgent::passing().with_stage_delay(Duration::from_millis(30)));
    let store = Arc::new(MemoryStatusStore::new().with_rows(rows));
    let scheduler = Scheduler::new(
        Arc::clone(&agent),
        store,
        Arc::new(ArtifactStore::new(temp.path())),
    );

    let summary = scheduler.run_all(&RunContext::new(3)).await.unwrap();

    assert_eq!(summary.totals.passed, 10);
    assert!(
        agent.max_concurrent_executes() <= 3,
        "saw {} concurrent executes",
        agent.max_concurrent_executes()
    );
}

#[tokio::test]
async fn panic_in_one_pipeline_leaves_others_standing() {
    let temp = TempDir::new().unwrap();
    let agent = MockAgent::passing().with_panic_on_execute("tool-1");
    let store = Arc::new(MemoryStatusStore::new().with_rows(backlog(&[
        "https://github.com/acme/tool-0",
        "https://github.com/acme/tool-1",
        "https://github.com/acme/tool-2",
    ])));
    let scheduler = Scheduler::new(
        Arc::new(agent),
        Arc::clone(&store),
        Arc::new(ArtifactStore::new(temp.path())),
    );

    let summary = scheduler.run_all(&RunContext::new(3)).await.unwrap();

    assert_eq!(summary.totals.dispatched, 3);
    assert_eq!(summary.totals.passed, 2);
    assert_eq!(summary.totals.failed, 1);
    assert!(summary.all_terminal());
    assert_eq!(store.row("tool-1").unwrap().status, ToolStatus::Failed);
}

#[tokio::test]
async fn file_backed_backlog_survives_full_cycle() {
    let temp = TempDir::new().unwrap();
    let backlog_path = temp.path().join("backlog.json");
    let store = JsonStatusStore::create(
        &backlog_path,
        backlog(&["https://github.com/BurntSushi/ripgrep"]),
    )
    .unwrap();

    let artifacts = Arc::new(ArtifactStore::new(&temp.path().join("artifacts")));
    let scheduler = Scheduler::new(Arc::new(MockAgent::passing()), Arc::new(store), artifacts);

    let summary = scheduler.run_all(&RunContext::new(1)).await.unwrap();
    assert_eq!(summary.totals.passed, 1);

    // Reopen the file cold and confirm the write-back stuck
    let reopened = JsonStatusStore::open(&backlog_path).unwrap();
    let rows = reopened.load_rows().await.unwrap();
    assert_eq!(rows[0].status, ToolStatus::Passed);
    assert!(rows[0].artifact_path.is_some());
    assert!(rows[0].updated_at.is_some());
}

#[tokio::test]
async fn runner_alone_respects_cancellation() {
    let temp = TempDir::new().unwrap();
    let agent = Arc::new(MockAgent::passing().with_stage_delay(Duration::from_secs(30)));
    let artifacts = Arc::new(ArtifactStore::new(temp.path()));
    let runner = PipelineRunner::new(agent, Arc::clone(&artifacts));

    let ctx = RunContext::new(1).with_run_id("run-cancel");
    artifacts.begin_run(&ctx.run_id).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let tool = ToolSpec::from_source_url("https://github.com/BurntSushi/ripgrep");
    let outcome = runner.run(&tool, &ctx, &cancel).await.unwrap();

    assert_eq!(outcome.final_state, JobState::Failed);
    assert_eq!(outcome.last_diagnostic.as_deref(), Some("run cancelled"));
}
