//! C8 (part) — the per-unit pipeline. Strict sequence:
//! workspace -> skills -> mcps -> adapter run -> assertions -> metrics.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use pitlane_adapters::{Adapter, AdapterRunConfig};
use pitlane_config::{AssistantConfig, TaskConfig};
use pitlane_core::types::IterationResult;
use pitlane_core::{PitlaneError, Result};
use pitlane_eval::{build_iteration_result, evaluate_assertion, FilesystemSnapshot, SimilarityBinaries};
use pitlane_workspace::WorkspaceManager;

/// Everything one (assistant, task, iteration) unit needs, borrowed from the
/// run's validated config for the duration of the run.
pub struct UnitSpec<'a> {
    pub run_id: &'a str,
    pub assistant_name: &'a str,
    pub assistant: &'a AssistantConfig,
    pub task: &'a TaskConfig,
    pub iteration: u32,
    pub environ: &'a HashMap<String, String>,
    pub similarity_bins: &'a SimilarityBinaries,
}

impl UnitSpec<'_> {
    /// `<assistant>_<task>_iter<i>`, the stable identifier used both for the
    /// unit's tracing span and its progress-line label.
    pub fn unit_name(&self) -> String {
        format!("{}_{}_iter{}", self.assistant_name, self.task.name, self.iteration)
    }
}

/// Run one unit end to end and return its `IterationResult`. Skill and MCP
/// installation failures are fatal to the unit; the adapter run itself
/// never fails the unit (launch failures are captured inside the
/// `AssistantResult` and scored like any other outcome).
pub async fn run_unit(workspace_manager: &WorkspaceManager, spec: &UnitSpec<'_>) -> Result<IterationResult> {
    let source_dir = PathBuf::from(&spec.task.workdir);
    let workspace = workspace_manager.create_workspace(
        &source_dir,
        spec.run_id,
        spec.assistant_name,
        &spec.task.name,
        spec.iteration,
    )?;

    for skill in &spec.assistant.skills {
        workspace_manager
            .install_skill(&workspace, skill, spec.assistant.adapter.agent_type())
            .await?;
    }

    for mcp in &spec.assistant.mcps {
        spec.assistant
            .adapter
            .install_mcp(&workspace, mcp, spec.environ)
            .map_err(|e| PitlaneError::McpInstallFailed(mcp.name.clone(), e.to_string()))?;
    }

    // Snapshot after the harness's own side-channel writes, so files_created/
    // files_modified reflect the assistant's own changes, not ours.
    let before = FilesystemSnapshot::capture(&workspace);

    let run_config = AdapterRunConfig { args: spec.assistant.args.clone(), timeout: Duration::from_secs(spec.task.timeout) };
    let result = spec.assistant.adapter.run(&spec.task.prompt, &workspace, &run_config).await;

    let mut assertions = Vec::with_capacity(spec.task.assertions.len());
    for record in &spec.task.assertions {
        assertions.push(evaluate_assertion(&workspace, record, &source_dir, spec.similarity_bins).await);
    }

    let iteration = build_iteration_result(&workspace, &result, assertions, &before, spec.iteration);

    let unit_dir = workspace_manager.unit_dir(spec.run_id, spec.assistant_name, &spec.task.name, spec.iteration);
    pitlane_report::write_conversation(&unit_dir.join("conversation.json"), &result.transcript)
        .map_err(|e| PitlaneError::Io(std::io::Error::other(e.to_string())))?;

    Ok(iteration)
}
