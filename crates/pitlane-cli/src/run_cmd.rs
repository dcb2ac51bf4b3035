//! `pitlane run` — load a config, drive the orchestrator, and translate its
//! outcome into an exit code: 1 when the config is missing, when the run
//! was interrupted, or when any suite has a JUnit failure; 0 otherwise.

use std::path::PathBuf;

use anyhow::Result;
use pitlane_core::PitlaneError;
use pitlane_orchestrator::{run, RunLogLayer, RunOptions, UnitLogLayer};

fn split_csv(raw: &Option<String>) -> Option<Vec<String>> {
    raw.as_ref().map(|s| s.split(',').map(|part| part.trim().to_string()).filter(|p| !p.is_empty()).collect())
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_run(
    config: String,
    task: Option<String>,
    assistant: Option<String>,
    skip_assistant: Option<String>,
    output_dir: String,
    verbose: bool,
    parallel: u32,
    repeat: u32,
    unit_log_layer: &UnitLogLayer,
    run_log_layer: &RunLogLayer,
) -> Result<i32> {
    let config_path = PathBuf::from(&config);
    let eval_config = match pitlane_config::load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(PitlaneError::ConfigNotFound(path)) => {
            eprintln!("config file not found: {}", path.display());
            return Ok(1);
        }
        Err(e) => {
            eprintln!("{e}");
            return Ok(1);
        }
    };

    let options = RunOptions {
        output_dir: PathBuf::from(output_dir),
        task_filter: task,
        assistant_include: split_csv(&assistant),
        assistant_exclude: split_csv(&skip_assistant),
        verbose,
        parallel_tasks: parallel as usize,
        repeat,
        pitlane_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let outcome = match run(&eval_config, &options, unit_log_layer, run_log_layer).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("run failed: {e:#}");
            return Ok(1);
        }
    };

    println!("run directory: {}", outcome.run_dir.display());
    if outcome.interrupted {
        println!("run was interrupted before completion");
    }

    if outcome.interrupted || outcome.any_suite_failed {
        Ok(1)
    } else {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_trims_and_drops_empty_entries() {
        let raw = Some(" claude , bob ,,".to_string());
        assert_eq!(split_csv(&raw), Some(vec!["claude".to_string(), "bob".to_string()]));
    }

    #[test]
    fn test_split_csv_none_stays_none() {
        assert_eq!(split_csv(&None), None);
    }

    #[tokio::test]
    async fn test_handle_run_missing_config_exits_one() {
        let layer = UnitLogLayer::new();
        let run_log_layer = RunLogLayer::new();
        let code = handle_run(
            "/nonexistent/eval.yaml".to_string(),
            None,
            None,
            None,
            "runs".to_string(),
            false,
            4,
            1,
            &layer,
            &run_log_layer,
        )
        .await
        .unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_handle_run_success_exits_zero() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("hello.py"), "print('hi')").unwrap();
        let config_dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            "assistants:\n  claude:\n    adapter: claude-code\ntasks:\n  - name: hello-world\n    prompt: \"write hello.py\"\n    workdir: \"{}\"\n    assertions:\n      - file_exists: hello.py\n",
            source.path().to_string_lossy().replace('\\', "/")
        );
        let config_path = config_dir.path().join("eval.yaml");
        std::fs::write(&config_path, yaml).unwrap();
        let output = tempfile::tempdir().unwrap();
        let layer = UnitLogLayer::new();
        let run_log_layer = RunLogLayer::new();

        let code = handle_run(
            config_path.to_string_lossy().into_owned(),
            None,
            None,
            None,
            output.path().to_string_lossy().into_owned(),
            false,
            1,
            1,
            &layer,
            &run_log_layer,
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
    }
}
