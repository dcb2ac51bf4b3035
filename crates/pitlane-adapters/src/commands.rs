use std::path::Path;

use pitlane_core::types::AdapterKind;

use crate::adapter::AdapterRunConfig;

/// Build the argv for a single assistant invocation. Every flag beyond the
/// bare minimum is read from the assistant's free-form `args` map, mirroring
/// each CLI's own per-adapter option surface; the prompt is always appended
/// last so adapters that read it positionally keep working.
pub fn build_command(kind: AdapterKind, prompt: &str, config: &AdapterRunConfig, workdir: &Path) -> Vec<String> {
    match kind {
        AdapterKind::Bob => build_bob(prompt, config),
        AdapterKind::ClaudeCode => build_claude_code(prompt, config),
        AdapterKind::Codex => build_codex(prompt, config, workdir),
        AdapterKind::Copilot => build_copilot(prompt, config, workdir),
        AdapterKind::Gemini => build_gemini(prompt, config),
        AdapterKind::Kilo => build_kilo(prompt, config),
        AdapterKind::MistralVibe => build_mistral_vibe(prompt, config),
        AdapterKind::Opencode => build_opencode(prompt, config),
        AdapterKind::Cline => build_cline(prompt, config),
    }
}

fn s(v: &str) -> String {
    v.to_string()
}

fn build_claude_code(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![
        s("claude"),
        s("-p"),
        s("--output-format"),
        s("stream-json"),
        s("--verbose"),
        s("--dangerously-skip-permissions"),
        s("--disable-slash-commands"),
        s("--setting-sources"),
        s("project,local"),
    ];
    if let Some(model) = config.get_str("model") {
        cmd.push(s("--model"));
        cmd.push(s(model));
    }
    if let Some(mcp_config) = config.get_str("mcp_config") {
        cmd.push(s("--mcp-config"));
        cmd.push(s(mcp_config));
    }
    if let Some(system_prompt) = config.get_str("append_system_prompt") {
        cmd.push(s("--append-system-prompt"));
        cmd.push(s(system_prompt));
    }
    if let Some(max_turns) = config.get_u64("max_turns") {
        cmd.push(s("--max-turns"));
        cmd.push(max_turns.to_string());
    }
    if let Some(max_budget) = config.get_f64("max_budget_usd") {
        cmd.push(s("--max-budget-usd"));
        cmd.push(max_budget.to_string());
    }
    cmd.push(s(prompt));
    cmd
}

fn build_codex(prompt: &str, config: &AdapterRunConfig, workdir: &Path) -> Vec<String> {
    let mut cmd = vec![s("codex"), s("exec"), s("--json"), s("--full-auto")];
    cmd.push(s("-C"));
    cmd.push(workdir.to_string_lossy().into_owned());
    if let Some(model) = config.get_str("model") {
        cmd.push(s("-m"));
        cmd.push(s(model));
    }
    cmd.push(s(prompt));
    cmd
}

fn build_copilot(prompt: &str, config: &AdapterRunConfig, workdir: &Path) -> Vec<String> {
    let mut cmd = vec![s("copilot"), s("-p"), s(prompt), s("--yolo")];
    cmd.push(s("--add-dir"));
    cmd.push(workdir.to_string_lossy().into_owned());
    let mcp_file = workdir.join(MCP_FILENAME_COPILOT);
    if mcp_file.exists() {
        cmd.push(s("--additional-mcp-config"));
        cmd.push(format!("@{}", mcp_file.to_string_lossy()));
    }
    if let Some(model) = config.get_str("model") {
        cmd.push(s("--model"));
        cmd.push(s(model));
    }
    cmd
}

fn build_gemini(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![
        s("gemini"),
        s("--output-format"),
        s("stream-json"),
        s("--approval-mode"),
        s("yolo"),
    ];
    if let Some(model) = config.get_str("model") {
        cmd.push(s("-m"));
        cmd.push(s(model));
    }
    cmd.push(s(prompt));
    cmd
}

fn build_kilo(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![s("kilo"), s("run"), s("--auto"), s("--format"), s("json")];
    if let Some(model) = config.get_str("model") {
        cmd.push(s("-m"));
        cmd.push(s(model));
    }
    if let Some(agent) = config.get_str("agent") {
        cmd.push(s("--agent"));
        cmd.push(s(agent));
    }
    cmd.push(s(prompt));
    cmd
}

fn build_opencode(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![s("opencode"), s("run"), s("--format"), s("json")];
    if let Some(model) = config.get_str("model") {
        cmd.push(s("--model"));
        cmd.push(s(model));
    }
    if let Some(agent) = config.get_str("agent") {
        cmd.push(s("--agent"));
        cmd.push(s(agent));
    }
    if let Some(files) = config.args.get("file").and_then(|v| v.as_array()) {
        for f in files {
            if let Some(f) = f.as_str() {
                cmd.push(s("--file"));
                cmd.push(s(f));
            }
        }
    }
    if let Some(session) = config.get_str("session") {
        cmd.push(s("--session"));
        cmd.push(s(session));
    }
    if config.args.get("continue_").and_then(|v| v.as_bool()).unwrap_or(false) {
        cmd.push(s("--continue"));
    }
    if config.args.get("fork").and_then(|v| v.as_bool()).unwrap_or(false) {
        cmd.push(s("--fork"));
    }
    if let Some(title) = config.get_str("title") {
        cmd.push(s("--title"));
        cmd.push(s(title));
    }
    if config.args.get("share").and_then(|v| v.as_bool()).unwrap_or(false) {
        cmd.push(s("--share"));
    }
    if let Some(attach) = config.get_str("attach") {
        cmd.push(s("--attach"));
        cmd.push(s(attach));
    }
    if let Some(port) = config.get_u64("port") {
        cmd.push(s("--port"));
        cmd.push(port.to_string());
    }
    cmd.push(s(prompt));
    cmd
}

fn build_bob(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![s("bob"), s("--output-format"), s("stream-json"), s("--yolo")];
    if let Some(chat_mode) = config.get_str("chat_mode") {
        cmd.push(s("--chat-mode"));
        cmd.push(s(chat_mode));
    }
    if let Some(max_coins) = config.get_u64("max_coins") {
        cmd.push(s("--max-coins"));
        cmd.push(max_coins.to_string());
    }
    cmd.push(s(prompt));
    cmd
}

/// Mistral Vibe and Cline are named in the closed adapter set but absent from
/// the retrieved `pitlane/` tree; argv is carried over unchanged from the
/// older `agent_eval/` adapters.
fn build_mistral_vibe(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![s("vibe"), s("--prompt"), s(prompt), s("--output"), s("json")];
    if let Some(max_turns) = config.get_u64("max_turns") {
        cmd.push(s("--max-turns"));
        cmd.push(max_turns.to_string());
    }
    if let Some(max_price) = config.get_f64("max_price") {
        cmd.push(s("--max-price"));
        cmd.push(max_price.to_string());
    }
    cmd
}

fn build_cline(prompt: &str, config: &AdapterRunConfig) -> Vec<String> {
    let mut cmd = vec![s("cline"), s("-y"), s("--json")];
    if let Some(timeout) = config.get_u64("timeout") {
        cmd.push(s("--timeout"));
        cmd.push(timeout.to_string());
    }
    cmd.push(s(prompt));
    cmd
}

pub const MCP_FILENAME_COPILOT: &str = ".pitlane_copilot_mcp.json";

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::time::Duration;

    fn config(args: IndexMap<String, serde_json::Value>) -> AdapterRunConfig {
        AdapterRunConfig { args, timeout: Duration::from_secs(60) }
    }

    #[test]
    fn test_claude_code_base_command() {
        let cmd = build_claude_code("hello", &config(IndexMap::new()));
        assert_eq!(cmd[0], "claude");
        assert_eq!(cmd.last().unwrap(), "hello");
        assert!(cmd.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn test_claude_code_includes_optional_model() {
        let mut args = IndexMap::new();
        args.insert("model".to_string(), serde_json::json!("claude-opus-4"));
        let cmd = build_claude_code("hi", &config(args));
        let idx = cmd.iter().position(|a| a == "--model").unwrap();
        assert_eq!(cmd[idx + 1], "claude-opus-4");
    }

    #[test]
    fn test_codex_includes_workdir_flag() {
        let cmd = build_codex("hi", &config(IndexMap::new()), Path::new("/tmp/work"));
        let idx = cmd.iter().position(|a| a == "-C").unwrap();
        assert_eq!(cmd[idx + 1], "/tmp/work");
        assert_eq!(cmd.last().unwrap(), "hi");
    }

    #[test]
    fn test_opencode_repeatable_file_flag() {
        let mut args = IndexMap::new();
        args.insert("file".to_string(), serde_json::json!(["a.py", "b.py"]));
        let cmd = build_opencode("hi", &config(args));
        let occurrences = cmd.iter().filter(|a| *a == "--file").count();
        assert_eq!(occurrences, 2);
    }

    #[test]
    fn test_prompt_is_always_last_token_when_positional() {
        let cmd = build_gemini("the prompt", &config(IndexMap::new()));
        assert_eq!(cmd.last().unwrap(), "the prompt");
    }

    #[test]
    fn test_bob_base_command_uses_stream_json_and_yolo() {
        let cmd = build_bob("hi", &config(IndexMap::new()));
        assert_eq!(cmd[0], "bob");
        assert!(cmd.contains(&"--output-format".to_string()));
        assert!(cmd.contains(&"stream-json".to_string()));
        assert!(cmd.contains(&"--yolo".to_string()));
        assert_eq!(cmd.last().unwrap(), "hi");
    }

    #[test]
    fn test_bob_includes_optional_chat_mode_and_max_coins() {
        let mut args = IndexMap::new();
        args.insert("chat_mode".to_string(), serde_json::json!("careful"));
        args.insert("max_coins".to_string(), serde_json::json!(10));
        let cmd = build_bob("hi", &config(args));
        let idx = cmd.iter().position(|a| a == "--chat-mode").unwrap();
        assert_eq!(cmd[idx + 1], "careful");
        let idx = cmd.iter().position(|a| a == "--max-coins").unwrap();
        assert_eq!(cmd[idx + 1], "10");
        assert_eq!(cmd.last().unwrap(), "hi");
    }
}
