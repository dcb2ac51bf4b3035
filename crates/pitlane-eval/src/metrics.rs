//! C6 — the metrics collector. Folds an `AssistantResult`, its assertion
//! outcomes, and a before/after filesystem snapshot into a flat
//! `MetricsMap`, plus builds the full `IterationResult`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use pitlane_core::types::{AssertionResult, AssistantResult, IterationResult, MetricsMap};

/// The set of file paths under a workspace at a point in time, used to
/// derive `files_created`/`files_modified` as a coarse, conservative signal
/// rather than a true content diff.
#[derive(Debug, Clone, Default)]
pub struct FilesystemSnapshot {
    paths: HashSet<PathBuf>,
}

impl FilesystemSnapshot {
    /// Walk `dir` and record every regular file's path relative to it.
    /// A missing directory yields an empty snapshot (pre-run snapshot of a
    /// workspace that doesn't exist yet).
    pub fn capture(dir: &Path) -> Self {
        if !dir.exists() {
            return FilesystemSnapshot::default();
        }
        let paths = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.path().strip_prefix(dir).ok().map(|p| p.to_path_buf()))
            .collect();
        FilesystemSnapshot { paths }
    }

    fn created_since(&self, before: &FilesystemSnapshot) -> usize {
        self.paths.difference(&before.paths).count()
    }

    /// Conservative: every file present both before and after counts as
    /// "modified", whether or not its content actually changed.
    fn modified_since(&self, before: &FilesystemSnapshot) -> usize {
        self.paths.intersection(&before.paths).count()
    }
}

/// Sum of line counts over every file in `dir`; files that fail to decode as
/// UTF-8 text are skipped silently.
fn total_lines(dir: &Path) -> u64 {
    if !dir.exists() {
        return 0;
    }
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| std::fs::read_to_string(e.path()).ok())
        .map(|contents| contents.lines().count() as u64)
        .sum()
}

fn weighted_score(assertions: &[AssertionResult]) -> f64 {
    let total_weight: f64 = assertions.iter().map(|a| a.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = assertions.iter().map(|a| a.weight * a.score).sum();
    100.0 * weighted_sum / total_weight
}

/// Build the full metrics map for one finished unit. `workspace` is walked
/// once more here to derive `total_lines_generated`; `after` is assumed to
/// already be `FilesystemSnapshot::capture(workspace)`.
pub fn compute_metrics(
    workspace: &Path,
    result: &AssistantResult,
    assertions: &[AssertionResult],
    before: &FilesystemSnapshot,
    after: &FilesystemSnapshot,
) -> MetricsMap {
    let mut metrics: MetricsMap = IndexMap::new();

    metrics.insert("wall_clock_seconds".to_string(), Some(result.duration_seconds));
    metrics.insert("exit_code".to_string(), Some(result.exit_code as f64));
    metrics.insert("timed_out".to_string(), Some(if result.timed_out { 1.0 } else { 0.0 }));

    metrics.insert("files_created".to_string(), Some(after.created_since(before) as f64));
    metrics.insert("files_modified".to_string(), Some(after.modified_since(before) as f64));
    metrics.insert("total_lines_generated".to_string(), Some(total_lines(workspace) as f64));

    match result.token_usage {
        Some(usage) => {
            metrics.insert("token_usage_input".to_string(), Some(usage.input as f64));
            metrics.insert("token_usage_output".to_string(), Some(usage.output as f64));
            metrics.insert(
                "token_usage_input_cached".to_string(),
                usage.input_cached.map(|v| v as f64),
            );
        }
        None => {
            metrics.insert("token_usage_input".to_string(), None);
            metrics.insert("token_usage_output".to_string(), None);
            metrics.insert("token_usage_input_cached".to_string(), None);
        }
    }
    metrics.insert("cost_usd".to_string(), result.cost_usd);
    metrics.insert("tool_calls_count".to_string(), Some(result.tool_calls_count as f64));

    let pass_count = assertions.iter().filter(|a| a.passed).count();
    let fail_count = assertions.len() - pass_count;
    let pass_rate = if assertions.is_empty() {
        0.0
    } else {
        100.0 * pass_count as f64 / assertions.len() as f64
    };
    metrics.insert("pass_count".to_string(), Some(pass_count as f64));
    metrics.insert("fail_count".to_string(), Some(fail_count as f64));
    metrics.insert("assertion_pass_rate".to_string(), Some(pass_rate));
    metrics.insert("weighted_score".to_string(), Some(weighted_score(assertions)));

    metrics
}

/// Build the complete `IterationResult` for one unit.
pub fn build_iteration_result(
    workspace: &Path,
    result: &AssistantResult,
    assertions: Vec<AssertionResult>,
    before: &FilesystemSnapshot,
    iteration_index: u32,
) -> IterationResult {
    let after = FilesystemSnapshot::capture(workspace);
    let metrics = compute_metrics(workspace, result, &assertions, before, &after);

    let all_passed = assertions.iter().all(|a| a.passed);
    IterationResult { metrics, assertions, all_passed, iteration_index }
}
