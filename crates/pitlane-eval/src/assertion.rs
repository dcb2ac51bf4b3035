//! C5 — the assertion engine. `evaluate_assertion` dispatches a single
//! `AssertionRecord` to its handler and always returns an `AssertionResult`;
//! assertion failures are recorded, never raised. The only raise-worthy
//! condition (an assertion kind unknown to the dispatcher) is structurally
//! impossible here since `AssertionRecord` is a closed enum deserialised by
//! `pitlane-config` — an unknown kind is therefore a compile-time concern,
//! not a runtime one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pitlane_config::{
    AssertionRecord, CustomScriptFull, FileContainsSpec, SimilaritySpec,
};
use pitlane_core::types::AssertionResult;
use regex::Regex;

use crate::similarity::{self, SimilarityBinaries};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Evaluate one assertion record against a finished unit's workspace.
/// `source_dir` is the task's original fixture directory (never the
/// workspace), so similarity handlers can read `refs/`-style expected files
/// the assistant never saw.
pub async fn evaluate_assertion(
    workdir: &Path,
    record: &AssertionRecord,
    source_dir: &Path,
    similarity_bins: &SimilarityBinaries,
) -> AssertionResult {
    let weight = record.weight();
    let (name, passed, message, score) = match record {
        AssertionRecord::FileExists(a) => file_exists(workdir, &a.file_exists),
        AssertionRecord::FileContains(a) => file_contains(workdir, &a.file_contains),
        AssertionRecord::CommandSucceeds(a) => {
            command_outcome(workdir, &a.command_succeeds, true).await
        }
        AssertionRecord::CommandFails(a) => {
            command_outcome(workdir, &a.command_fails, false).await
        }
        AssertionRecord::CustomScript(a) => custom_script(workdir, &a.custom_script.normalized()).await,
        AssertionRecord::Bleu(a) => similarity_kind("bleu", workdir, source_dir, &a.bleu, similarity_bins).await,
        AssertionRecord::Rouge(a) => {
            similarity_kind("rouge", workdir, source_dir, &a.rouge, similarity_bins).await
        }
        AssertionRecord::Bertscore(a) => {
            similarity_kind("bertscore", workdir, source_dir, &a.bertscore, similarity_bins).await
        }
        AssertionRecord::CosineSimilarity(a) => {
            similarity_kind("cosine_similarity", workdir, source_dir, &a.cosine_similarity, similarity_bins).await
        }
    };

    AssertionResult { name, passed, message, score, weight }
}

fn file_exists(workdir: &Path, path: &str) -> (String, bool, String, f64) {
    let name = format!("file_exists:{path}");
    let resolved = workdir.join(path);
    if resolved.exists() {
        (name, true, format!("{path} exists"), 1.0)
    } else {
        (name, false, format!("{path} does not exist"), 0.0)
    }
}

fn file_contains(workdir: &Path, spec: &FileContainsSpec) -> (String, bool, String, f64) {
    let name = format!("file_contains:{}", spec.path);
    let resolved = workdir.join(&spec.path);
    let contents = match std::fs::read_to_string(&resolved) {
        Ok(c) => c,
        Err(e) => return (name, false, format!("could not read {}: {e}", spec.path), 0.0),
    };
    let regex = match Regex::new(&spec.pattern) {
        Ok(r) => r,
        Err(e) => return (name, false, format!("invalid pattern '{}': {e}", spec.pattern), 0.0),
    };
    if regex.is_match(&contents) {
        (name, true, format!("{} matches /{}/", spec.path, spec.pattern), 1.0)
    } else {
        (name, false, format!("{} does not match /{}/", spec.path, spec.pattern), 0.0)
    }
}

/// `command_succeeds`/`command_fails` share one shell-out path; `want_zero`
/// picks which exit-code polarity counts as a pass. A timeout always counts
/// as failure for `succeeds` and as pass for `fails`.
async fn command_outcome(workdir: &Path, command: &str, want_zero: bool) -> (String, bool, String, f64) {
    let kind = if want_zero { "command_succeeds" } else { "command_fails" };
    let name = format!("{kind}:{command}");
    let argv = shell_argv(command);

    match pitlane_process::run_streaming(&argv, workdir, COMMAND_TIMEOUT, None).await {
        Ok(out) if out.timed_out => {
            let passed = !want_zero;
            let message = format!("`{command}` timed out after {}s", COMMAND_TIMEOUT.as_secs());
            (name, passed, message, if passed { 1.0 } else { 0.0 })
        }
        Ok(out) => {
            let succeeded = out.exit_code == 0;
            let passed = succeeded == want_zero;
            let message = format!("`{command}` exited with code {}", out.exit_code);
            (name, passed, message, if passed { 1.0 } else { 0.0 })
        }
        Err(e) => (name, false, format!("failed to launch `{command}`: {e}"), 0.0),
    }
}

fn shell_argv(command: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), command.to_string()]
}

async fn custom_script(workdir: &Path, spec: &CustomScriptFull) -> (String, bool, String, f64) {
    let name = format!("custom_script:{}", spec.script);
    let script_path = resolve_script_path(workdir, &spec.script);
    if !script_path.exists() {
        return (name, false, format!("script '{}' does not exist", spec.script), 0.0);
    }

    let mut argv = Vec::new();
    if let Some(interpreter) = &spec.interpreter {
        argv.push(interpreter.clone());
        argv.extend(spec.interpreter_args.iter().cloned());
        argv.push(script_path.to_string_lossy().into_owned());
    } else {
        argv.push(script_path.to_string_lossy().into_owned());
    }
    argv.extend(spec.script_args.iter().cloned());

    let timeout = Duration::from_secs(spec.timeout);
    match pitlane_process::run_streaming(&argv, workdir, timeout, None).await {
        Ok(out) if out.timed_out => (
            name,
            false,
            format!("'{}' timed out after {}s", spec.script, spec.timeout),
            0.0,
        ),
        Ok(out) => {
            let passed = out.exit_code == spec.expected_exit_code;
            let message = format!(
                "'{}' exited with code {} (expected {})",
                spec.script, out.exit_code, spec.expected_exit_code
            );
            (name, passed, message, if passed { 1.0 } else { 0.0 })
        }
        Err(e) => (name, false, format!("failed to launch '{}': {e}", spec.script), 0.0),
    }
}

fn resolve_script_path(workdir: &Path, script: &str) -> PathBuf {
    let p = Path::new(script);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        workdir.join(p)
    }
}

/// Similarity handlers read `actual` from the workspace and `expected` from
/// the task's source fixture — never from the workspace, so reference files
/// stay invisible to the assistant under test.
async fn similarity_kind(
    kind: &str,
    workdir: &Path,
    source_dir: &Path,
    spec: &SimilaritySpec,
    bins: &SimilarityBinaries,
) -> (String, bool, String, f64) {
    let name = format!("{kind}:{}", spec.actual);
    let actual_path = workdir.join(&spec.actual);
    let expected_path = source_dir.join(&spec.expected);

    let raw = match similarity::score(kind, &actual_path, &expected_path, spec.metric.as_deref(), bins).await {
        Ok(raw) => raw,
        Err(e) => return (name, false, format!("{kind} scorer failed: {e}"), 0.0),
    };

    let (score, passed) = match spec.min_score {
        Some(min_score) if min_score > 0.0 => ((raw / min_score).min(1.0), raw >= min_score),
        Some(min_score) => (raw, raw >= min_score),
        None => (raw, true),
    };

    let message = match spec.min_score {
        Some(min_score) => format!("{kind} raw={raw:.4} min_score={min_score:.4}"),
        None => format!("{kind} raw={raw:.4}"),
    };
    (name, passed, message, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitlane_config::{CustomScriptSpec, FileContainsAssertion, FileExistsAssertion};

    fn bins() -> SimilarityBinaries {
        SimilarityBinaries::default()
    }

    #[tokio::test]
    async fn test_file_exists_passes_for_present_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.py"), "print(1)").unwrap();
        let record = AssertionRecord::FileExists(FileExistsAssertion {
            file_exists: "hello.py".to_string(),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(result.passed);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.name, "file_exists:hello.py");
    }

    #[tokio::test]
    async fn test_file_exists_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let record = AssertionRecord::FileExists(FileExistsAssertion {
            file_exists: "missing.py".to_string(),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_file_contains_matches_regex() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), r#"resource "aws_s3_bucket" "b" {}"#).unwrap();
        let record = AssertionRecord::FileContains(FileContainsAssertion {
            file_contains: FileContainsSpec {
                path: "main.tf".to_string(),
                pattern: "aws_s3_bucket".to_string(),
            },
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_file_contains_fails_on_pattern_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), r#"resource "aws_s3_bucket" "b" {}"#).unwrap();
        let record = AssertionRecord::FileContains(FileContainsAssertion {
            file_contains: FileContainsSpec {
                path: "main.tf".to_string(),
                pattern: "gcp_bucket".to_string(),
            },
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_file_contains_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let record = AssertionRecord::FileContains(FileContainsAssertion {
            file_contains: FileContainsSpec { path: "nope.tf".to_string(), pattern: "x".to_string() },
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_command_succeeds_passes_on_exit_zero() {
        let dir = tempfile::tempdir().unwrap();
        let record = AssertionRecord::CommandSucceeds(pitlane_config::CommandSucceedsAssertion {
            command_succeeds: "exit 0".to_string(),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_command_fails_passes_on_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let record = AssertionRecord::CommandFails(pitlane_config::CommandFailsAssertion {
            command_fails: "exit 1".to_string(),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_command_succeeds_fails_on_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let record = AssertionRecord::CommandSucceeds(pitlane_config::CommandSucceedsAssertion {
            command_succeeds: "exit 3".to_string(),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_custom_script_bare_path_passes_on_expected_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("check.sh"), "#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir.path().join("check.sh"), std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let record = AssertionRecord::CustomScript(pitlane_config::CustomScriptAssertion {
            custom_script: CustomScriptSpec::Bare("check.sh".to_string()),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_custom_script_missing_file_fails_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let record = AssertionRecord::CustomScript(pitlane_config::CustomScriptAssertion {
            custom_script: CustomScriptSpec::Bare("nope.sh".to_string()),
            weight: 1.0,
        });
        let result = evaluate_assertion(dir.path(), &record, dir.path(), &bins()).await;
        assert!(!result.passed);
        assert!(result.message.contains("does not exist"));
    }

    #[test]
    fn test_shell_argv_wraps_in_sh_c() {
        let argv = shell_argv("echo hi");
        assert_eq!(argv, vec!["sh", "-c", "echo hi"]);
    }
}
