//! C8 (part) — bounded-parallel dispatch over the (assistant, task,
//! iteration) cartesian product, with progress reporting and cooperative
//! cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use pitlane_config::{AssistantConfig, TaskConfig};
use pitlane_core::types::IterationResult;
use pitlane_core::PitlaneError;
use pitlane_eval::SimilarityBinaries;
use pitlane_workspace::WorkspaceManager;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::logging::UnitLogLayer;
use crate::unit::{run_unit, UnitSpec};

/// One (assistant, task, iteration) unit queued for the pool.
#[derive(Clone)]
pub struct WorkItem {
    pub assistant_name: String,
    pub assistant: AssistantConfig,
    pub task: TaskConfig,
    pub iteration: u32,
}

/// One unit's outcome, tagged with the identifiers the caller needs to
/// group it for aggregation and reporting.
pub struct UnitOutcome {
    pub assistant_name: String,
    pub task_name: String,
    pub iteration: u32,
    pub outcome: Result<IterationResult, PitlaneError>,
}

pub struct DispatchResult {
    pub outcomes: Vec<UnitOutcome>,
    pub interrupted: bool,
}

/// Run `items` through a pool of `parallel_tasks` concurrent workers.
/// Cancellation (Ctrl-C) only stops units that have not yet started;
/// already-running children are left to hit their own timeout so their
/// partial artefacts stay coherent.
pub async fn dispatch_units(
    workspace_manager: Arc<WorkspaceManager>,
    run_id: Arc<str>,
    items: Vec<WorkItem>,
    parallel_tasks: usize,
    environ: Arc<HashMap<String, String>>,
    similarity_bins: Arc<SimilarityBinaries>,
    unit_log_layer: UnitLogLayer,
) -> DispatchResult {
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(parallel_tasks.max(1)));
    let cancellation = CancellationToken::new();
    let mut join_set: JoinSet<UnitOutcome> = JoinSet::new();

    let ctrl_c_token = cancellation.clone();
    let ctrl_c_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    for item in items {
        if cancellation.is_cancelled() {
            break;
        }
        let semaphore = semaphore.clone();
        let workspace_manager = workspace_manager.clone();
        let run_id = run_id.clone();
        let environ = environ.clone();
        let similarity_bins = similarity_bins.clone();
        let unit_log_layer = unit_log_layer.clone();
        let cancellation = cancellation.clone();

        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");

            let assistant_name = item.assistant_name.clone();
            let task_name = item.task.name.clone();
            let iteration = item.iteration;

            if cancellation.is_cancelled() {
                return UnitOutcome { assistant_name, task_name, iteration, outcome: Err(PitlaneError::Cancelled) };
            }

            let spec = UnitSpec {
                run_id: &run_id,
                assistant_name: &assistant_name,
                assistant: &item.assistant,
                task: &item.task,
                iteration,
                environ: &environ,
                similarity_bins: &similarity_bins,
            };
            let unit_name = spec.unit_name();

            let debug_log = workspace_manager.unit_dir(&run_id, &assistant_name, &task_name, iteration).join("debug.log");
            if let Err(e) = unit_log_layer.register(&unit_name, &debug_log) {
                return UnitOutcome { assistant_name, task_name, iteration, outcome: Err(e) };
            }

            let span = tracing::info_span!("unit", unit = %unit_name);
            let outcome = run_unit(&workspace_manager, &spec).instrument(span).await;

            UnitOutcome { assistant_name, task_name, iteration, outcome }
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    let mut completed = 0usize;
    while let Some(joined) = join_set.join_next().await {
        completed += 1;
        match joined {
            Ok(unit_outcome) => {
                print_progress(completed, total, &unit_outcome);
                if !matches!(unit_outcome.outcome, Err(PitlaneError::Cancelled)) {
                    outcomes.push(unit_outcome);
                }
            }
            Err(join_err) => {
                tracing::error!("unit task panicked: {join_err}");
            }
        }
    }

    ctrl_c_task.abort();

    DispatchResult { outcomes, interrupted: cancellation.is_cancelled() }
}

fn print_progress(completed: usize, total: usize, outcome: &UnitOutcome) {
    match &outcome.outcome {
        Ok(iteration) => {
            let pass_count = iteration.assertions.iter().filter(|a| a.passed).count();
            let total_assertions = iteration.assertions.len();
            let seconds = iteration.metrics.get("wall_clock_seconds").copied().flatten().unwrap_or(0.0);
            let verdict = if iteration.all_passed { "PASS" } else { "FAIL" };
            println!(
                "[{completed}/{total}] {verdict}  {} / {} [iter-{}] ({pass_count}/{total_assertions} assertions, {seconds:.1}s)",
                outcome.assistant_name, outcome.task_name, outcome.iteration
            );
        }
        Err(PitlaneError::Cancelled) => {
            println!("[{completed}/{total}] SKIPPED  {} / {} [iter-{}]: cancelled before starting", outcome.assistant_name, outcome.task_name, outcome.iteration);
        }
        Err(e) => {
            println!("[{completed}/{total}] ERROR  {} / {} [iter-{}]: {e}", outcome.assistant_name, outcome.task_name, outcome.iteration);
            tracing::error!("unit {} / {} [iter-{}] failed: {e}", outcome.assistant_name, outcome.task_name, outcome.iteration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pitlane_config::{AssertionRecord, FileExistsAssertion};
    use pitlane_core::types::AdapterKind;

    fn sample_item(source_dir: &std::path::Path, name: &str, iteration: u32) -> WorkItem {
        WorkItem {
            assistant_name: "claude".to_string(),
            assistant: AssistantConfig { adapter: AdapterKind::ClaudeCode, args: IndexMap::new(), skills: vec![], mcps: vec![] },
            task: TaskConfig {
                name: name.to_string(),
                prompt: "write hello.py".to_string(),
                workdir: source_dir.to_string_lossy().into_owned(),
                timeout: 5,
                assertions: vec![AssertionRecord::FileExists(FileExistsAssertion { file_exists: "hello.py".to_string(), weight: 1.0 })],
            },
            iteration,
        }
    }

    #[tokio::test]
    async fn test_dispatch_units_runs_every_item_and_reports_completion_count() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("hello.py"), "print('hi')").unwrap();
        let base = tempfile::tempdir().unwrap();
        let manager = Arc::new(WorkspaceManager::new(base.path()));
        let items = vec![sample_item(source.path(), "t1", 0), sample_item(source.path(), "t2", 0)];

        let result = dispatch_units(
            manager,
            Arc::from("run1"),
            items,
            2,
            Arc::new(HashMap::new()),
            Arc::new(SimilarityBinaries::default()),
            UnitLogLayer::new(),
        )
        .await;

        assert_eq!(result.outcomes.len(), 2);
        assert!(!result.interrupted);
        assert!(result.outcomes.iter().all(|o| o.outcome.is_ok()));
    }

    #[tokio::test]
    async fn test_dispatch_units_duplicate_unit_names_surface_as_errors() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("hello.py"), "print('hi')").unwrap();
        let base = tempfile::tempdir().unwrap();
        let manager = Arc::new(WorkspaceManager::new(base.path()));
        // Same assistant/task/iteration twice -> identical unit_name -> the
        // second registration must fail with DuplicateUnitLogger.
        let items = vec![sample_item(source.path(), "same-task", 0), sample_item(source.path(), "same-task", 0)];

        let result = dispatch_units(
            manager,
            Arc::from("run1"),
            items,
            1,
            Arc::new(HashMap::new()),
            Arc::new(SimilarityBinaries::default()),
            UnitLogLayer::new(),
        )
        .await;

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes.iter().filter(|o| o.outcome.is_err()).count(), 1);
    }
}
