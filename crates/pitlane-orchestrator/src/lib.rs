//! C8 — the orchestrator: validates the selected slice of an `EvalConfig`,
//! probes adapter CLI versions, expands the (assistant, task, iteration)
//! cartesian product, dispatches it through a bounded-parallel pool, folds
//! completed iterations into per-unit aggregates, and writes the run's
//! durable artefacts.

pub mod logging;
pub mod scheduler;
pub mod unit;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use pitlane_config::{AssistantConfig, EvalConfig, TaskConfig};
use pitlane_core::types::IterationResult;
use pitlane_eval::{aggregate_results, SimilarityBinaries};
use pitlane_report::{write_junit_report, write_meta, RunMeta, SuiteReport};
use pitlane_workspace::WorkspaceManager;

pub use logging::{RunLogLayer, UnitLogLayer};
pub use scheduler::{dispatch_units, DispatchResult, UnitOutcome, WorkItem};
pub use unit::{run_unit, UnitSpec};

/// Everything a single `run` invocation needs beyond the config document
/// itself.
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub task_filter: Option<String>,
    pub assistant_include: Option<Vec<String>>,
    pub assistant_exclude: Option<Vec<String>>,
    pub verbose: bool,
    pub parallel_tasks: usize,
    pub repeat: u32,
    pub pitlane_version: String,
}

pub struct RunOutcome {
    pub run_dir: PathBuf,
    pub interrupted: bool,
    pub any_suite_failed: bool,
}

fn select_assistants(config: &EvalConfig, options: &RunOptions) -> IndexMap<String, AssistantConfig> {
    config
        .assistants
        .iter()
        .filter(|(name, _)| options.assistant_include.as_ref().is_none_or(|list| list.contains(name)))
        .filter(|(name, _)| !options.assistant_exclude.as_ref().is_some_and(|list| list.contains(name)))
        .map(|(name, cfg)| (name.clone(), cfg.clone()))
        .collect()
}

fn select_tasks(config: &EvalConfig, options: &RunOptions) -> Vec<TaskConfig> {
    config
        .tasks
        .iter()
        .filter(|t| options.task_filter.as_ref().is_none_or(|name| &t.name == name))
        .cloned()
        .collect()
}

/// Run the full pipeline end to end and return the run directory plus the
/// two flags the CLI's exit-code contract needs.
pub async fn run(
    config: &EvalConfig,
    options: &RunOptions,
    unit_log_layer: &UnitLogLayer,
    run_log_layer: &RunLogLayer,
) -> anyhow::Result<RunOutcome> {
    let run_id = chrono::Utc::now().format("%Y-%m-%d_%H%M%S").to_string();
    let run_dir = options.output_dir.join(&run_id);
    std::fs::create_dir_all(&run_dir)?;
    run_log_layer.register(&run_dir.join("debug.log"))?;

    let environ: HashMap<String, String> = std::env::vars().collect();
    config.validate_mcp_env(&environ)?;

    let selected_assistants = select_assistants(config, options);
    let selected_tasks = select_tasks(config, options);

    let mut cli_versions = IndexMap::new();
    for (name, assistant) in &selected_assistants {
        if let Some(version) = pitlane_adapters::Adapter::get_cli_version(&assistant.adapter).await {
            let key = format!("{name} ({})", pitlane_adapters::Adapter::cli_name(&assistant.adapter));
            cli_versions.insert(key, version);
        }
    }

    let mut items = Vec::new();
    for (assistant_name, assistant) in &selected_assistants {
        for task in &selected_tasks {
            for iteration in 0..options.repeat {
                items.push(WorkItem {
                    assistant_name: assistant_name.clone(),
                    assistant: assistant.clone(),
                    task: task.clone(),
                    iteration,
                });
            }
        }
    }

    let workspace_manager = Arc::new(WorkspaceManager::new(run_dir.clone()));
    let similarity_bins = Arc::new(SimilarityBinaries::default());

    let dispatch = dispatch_units(
        workspace_manager,
        Arc::from(run_id.as_str()),
        items,
        options.parallel_tasks.max(1),
        Arc::new(environ),
        similarity_bins,
        unit_log_layer.clone(),
    )
    .await;

    let mut grouped: IndexMap<(String, String), Vec<IterationResult>> = IndexMap::new();
    for outcome in dispatch.outcomes {
        match outcome.outcome {
            Ok(iteration) => grouped.entry((outcome.assistant_name, outcome.task_name)).or_default().push(iteration),
            Err(e) => tracing::error!(
                "unit {} / {} [iter-{}] did not produce an iteration record: {e}",
                outcome.assistant_name,
                outcome.task_name,
                outcome.iteration
            ),
        }
    }

    let mut aggregated_by_unit = IndexMap::new();
    for ((assistant, task), mut iterations) in grouped {
        iterations.sort_by_key(|it| it.iteration_index);
        aggregated_by_unit.insert((assistant, task), aggregate_results(&iterations));
    }

    let suites: Vec<SuiteReport<'_>> =
        aggregated_by_unit.iter().map(|((assistant, task), aggregated)| SuiteReport { assistant, task, aggregated }).collect();
    let any_suite_failed = aggregated_by_unit.values().any(|a| !a.all_passed);

    write_junit_report(&run_dir.join("junit.xml"), &suites)?;

    let mut assistants: Vec<String> = selected_assistants.keys().cloned().collect();
    assistants.sort();
    let mut tasks: Vec<String> = selected_tasks.iter().map(|t| t.name.clone()).collect();
    tasks.sort();

    let meta = RunMeta {
        run_id: run_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        assistants,
        tasks,
        cli_versions,
        pitlane_version: options.pitlane_version.clone(),
        repeat: options.repeat,
        interrupted: dispatch.interrupted,
    };
    write_meta(&run_dir.join("meta.yaml"), &meta)?;

    Ok(RunOutcome { run_dir, interrupted: dispatch.interrupted, any_suite_failed })
}
