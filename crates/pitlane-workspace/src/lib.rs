//! C2 — per-unit workspace isolation: copying a task's source fixture into
//! a private directory per (run, assistant, task), and installing skills
//! into it before the assistant runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pitlane_config::SkillRef;
use pitlane_core::{PitlaneError, Result};

/// Copies fixture trees into isolated per-unit workspaces and tears them
/// down afterwards. `base_dir` is the run's output directory (e.g. `runs/`).
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        WorkspaceManager { base_dir: base_dir.into() }
    }

    /// Copy `source_dir` to
    /// `<base_dir>/<run_id>/<assistant_name>/<task_name>/iter-<iteration>/workspace`,
    /// skipping any path component literally named `refs` (reference
    /// solutions a task fixture may ship alongside the starter tree).
    pub fn create_workspace(
        &self,
        source_dir: &Path,
        run_id: &str,
        assistant_name: &str,
        task_name: &str,
        iteration: u32,
    ) -> Result<PathBuf> {
        if !source_dir.exists() {
            return Err(PitlaneError::WorkspaceSourceNotFound(source_dir.to_path_buf()));
        }
        let workspace = self.unit_dir(run_id, assistant_name, task_name, iteration).join("workspace");
        copy_tree_skipping_refs(source_dir, &workspace)?;
        Ok(workspace)
    }

    /// `<base_dir>/<run_id>/<assistant_name>/<task_name>/iter-<iteration>`,
    /// the directory a unit's `workspace/`, `conversation.json`, and
    /// `debug.log` all live under.
    pub fn unit_dir(&self, run_id: &str, assistant_name: &str, task_name: &str, iteration: u32) -> PathBuf {
        self.base_dir
            .join(run_id)
            .join(assistant_name)
            .join(task_name)
            .join(format!("iter-{iteration}"))
    }

    /// Best-effort teardown; a missing workspace is not an error since a
    /// unit that failed before workspace creation has nothing to remove.
    pub fn cleanup_workspace(&self, workspace: &Path) -> Result<()> {
        if workspace.exists() {
            std::fs::remove_dir_all(workspace)?;
        }
        Ok(())
    }

    /// `npx --yes skills add <source> --agent <agent_type> --yes [--skill
    /// <skill>]`, run inside `workspace`, 30s timeout.
    pub async fn install_skill(&self, workspace: &Path, skill: &SkillRef, agent_type: &str) -> Result<()> {
        let mut cmd = vec![
            "npx".to_string(),
            "--yes".to_string(),
            "skills".to_string(),
            "add".to_string(),
            skill.source.clone(),
            "--agent".to_string(),
            agent_type.to_string(),
            "--yes".to_string(),
        ];
        if let Some(name) = &skill.skill {
            cmd.push("--skill".to_string());
            cmd.push(name.clone());
        }

        let result = pitlane_process::run_streaming(&cmd, workspace, Duration::from_secs(30), None).await;

        match result {
            Ok(out) if out.timed_out => Err(PitlaneError::SkillInstallTimeout(30, skill.source.clone())),
            Ok(out) if out.exit_code != 0 => {
                Err(PitlaneError::SkillInstallFailed(skill.source.clone(), out.stderr))
            }
            Ok(_) => Ok(()),
            Err(e) => Err(PitlaneError::SkillInstallFailed(skill.source.clone(), e.to_string())),
        }
    }
}

/// `shutil.copytree(..., ignore=shutil.ignore_patterns("refs"))` equivalent:
/// recursively copy `src` into `dst`, never descending into or copying any
/// entry whose file name is exactly `refs`.
fn copy_tree_skipping_refs(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in walkdir::WalkDir::new(src)
        .into_iter()
        .filter_entry(|e| e.file_name() != "refs")
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry.path().strip_prefix(src).expect("walkdir yields paths under src");
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("refs")).unwrap();
        std::fs::write(dir.join("refs/solution.py"), "reference").unwrap();
        std::fs::write(dir.join("hello.py"), "print('hi')").unwrap();
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/nested.txt"), "nested").unwrap();
    }

    #[test]
    fn test_create_workspace_copies_tree_and_skips_refs() {
        let source = tempfile::tempdir().unwrap();
        write_fixture(source.path());
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());

        let workspace = manager.create_workspace(source.path(), "run1", "claude", "hello-world", 0).unwrap();

        assert!(workspace.join("hello.py").exists());
        assert!(workspace.join("sub/nested.txt").exists());
        assert!(!workspace.join("refs").exists());
        assert_eq!(
            workspace,
            base.path().join("run1").join("claude").join("hello-world").join("iter-0").join("workspace")
        );
    }

    #[test]
    fn test_create_workspace_missing_source_errors() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());
        let err = manager
            .create_workspace(Path::new("/nonexistent/source"), "run1", "claude", "task", 0)
            .unwrap_err();
        assert!(matches!(err, PitlaneError::WorkspaceSourceNotFound(_)));
    }

    #[test]
    fn test_create_workspace_distinct_iterations_do_not_collide() {
        let source = tempfile::tempdir().unwrap();
        write_fixture(source.path());
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());
        let w0 = manager.create_workspace(source.path(), "run1", "claude", "task", 0).unwrap();
        let w1 = manager.create_workspace(source.path(), "run1", "claude", "task", 1).unwrap();
        assert_ne!(w0, w1);
        assert!(w0.join("hello.py").exists());
        assert!(w1.join("hello.py").exists());
    }

    #[test]
    fn test_cleanup_workspace_removes_directory() {
        let source = tempfile::tempdir().unwrap();
        write_fixture(source.path());
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());
        let workspace = manager.create_workspace(source.path(), "run1", "claude", "task", 0).unwrap();
        assert!(workspace.exists());
        manager.cleanup_workspace(&workspace).unwrap();
        assert!(!workspace.exists());
    }

    #[test]
    fn test_cleanup_workspace_missing_dir_is_not_an_error() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path());
        assert!(manager.cleanup_workspace(&base.path().join("nonexistent")).is_ok());
    }

    #[tokio::test]
    async fn test_install_skill_missing_npx_surfaces_failure() {
        let workspace = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(workspace.path());
        let skill = SkillRef { source: "some/skill".to_string(), skill: None };
        // In an environment without a working `npx` this will fail fast with
        // either a launch error or a nonzero exit, never hang past 30s.
        let result = manager.install_skill(workspace.path(), &skill, "claude-code").await;
        let _ = result;
    }
}
