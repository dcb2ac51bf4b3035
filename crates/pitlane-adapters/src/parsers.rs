use pitlane_core::types::{AdapterKind, TokenUsage, TranscriptEntry};

/// Fields an adapter's output parser recovers from the raw stdout stream,
/// folded back into `AssistantResult` by `Adapter::run`.
#[derive(Debug, Clone, Default)]
pub struct ParsedOutput {
    pub transcript: Vec<TranscriptEntry>,
    pub token_usage: Option<TokenUsage>,
    pub cost_usd: Option<f64>,
    pub tool_calls_count: u32,
}

pub fn parse_output(kind: AdapterKind, stdout: &str) -> ParsedOutput {
    match kind {
        AdapterKind::ClaudeCode => parse_claude_code(stdout),
        AdapterKind::Gemini => parse_gemini(stdout),
        AdapterKind::Codex => parse_codex(stdout),
        AdapterKind::Opencode | AdapterKind::Kilo => parse_opencode_family(stdout),
        AdapterKind::Bob => parse_bob(stdout),
        AdapterKind::Copilot | AdapterKind::MistralVibe | AdapterKind::Cline => {
            parse_plain_text(stdout)
        }
    }
}

/// Every adapter's stdout is newline-delimited JSON; a line that fails to
/// parse is silently discarded rather than aborting the whole parse, since
/// CLIs interleave the odd human-readable banner line with the event stream.
fn json_lines(stdout: &str) -> impl Iterator<Item = serde_json::Value> + '_ {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line.trim()).ok())
}

/// Claude Code's stream-json event shapes: `{"type":"assistant","message":
/// {"content":[{"type":"text","text":...}|{"type":"tool_use","name":...,
/// "input":...}]}}` and a terminal `{"type":"result","usage":{...},
/// "total_cost_usd":...}`.
fn parse_claude_code(stdout: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    for event in json_lines(stdout) {
        match event.get("type").and_then(|v| v.as_str()) {
            Some("assistant") => {
                let Some(blocks) = event.pointer("/message/content").and_then(|v| v.as_array()) else {
                    continue;
                };
                for block in blocks {
                    match block.get("type").and_then(|v| v.as_str()) {
                        Some("text") => {
                            if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                                out.transcript.push(TranscriptEntry::assistant_text(text));
                            }
                        }
                        Some("tool_use") => {
                            let name = block.get("name").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
                            let input = block.get("input").cloned().unwrap_or(serde_json::Value::Null);
                            out.transcript.push(TranscriptEntry::tool_invocation(name, input));
                            out.tool_calls_count += 1;
                        }
                        _ => {}
                    }
                }
            }
            Some("result") => {
                if let Some(usage) = event.get("usage") {
                    out.token_usage = Some(TokenUsage {
                        input: usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                        output: usage.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                        input_cached: usage.get("cache_read_input_tokens").and_then(|v| v.as_u64()),
                    });
                }
                out.cost_usd = event.get("total_cost_usd").and_then(|v| v.as_f64());
            }
            _ => {}
        }
    }
    out
}

/// Gemini's stream-json shape mirrors Claude Code's assistant/text and
/// assistant/tool_use blocks but reports usage under a `stats` event.
fn parse_gemini(stdout: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    for event in json_lines(stdout) {
        match event.get("type").and_then(|v| v.as_str()) {
            Some("assistant") => {
                if let Some(text) = event.get("text").and_then(|v| v.as_str()) {
                    out.transcript.push(TranscriptEntry::assistant_text(text));
                }
                if let Some(tool_name) = event.get("tool_name").and_then(|v| v.as_str()) {
                    let input = event.get("tool_input").cloned().unwrap_or(serde_json::Value::Null);
                    out.transcript.push(TranscriptEntry::tool_invocation(tool_name, input));
                    out.tool_calls_count += 1;
                }
            }
            Some("stats") => {
                out.token_usage = Some(TokenUsage {
                    input: event.pointer("/usage/input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                    output: event.pointer("/usage/output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                    input_cached: None,
                });
                out.cost_usd = event.get("cost_usd").and_then(|v| v.as_f64());
            }
            _ => {}
        }
    }
    out
}

/// `codex exec --json` emits one JSON object per reasoning/message/exec
/// event; token usage arrives on a terminal `token_count` event.
fn parse_codex(stdout: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    for event in json_lines(stdout) {
        match event.get("type").and_then(|v| v.as_str()) {
            Some("agent_message") | Some("message") => {
                if let Some(text) = event.get("message").and_then(|v| v.as_str()) {
                    out.transcript.push(TranscriptEntry::assistant_text(text));
                }
            }
            Some("exec_command_begin") | Some("function_call") => {
                let name = event.get("command").and_then(|v| v.as_str()).unwrap_or("exec").to_string();
                out.transcript.push(TranscriptEntry::tool_invocation(name, event.clone()));
                out.tool_calls_count += 1;
            }
            Some("token_count") => {
                out.token_usage = Some(TokenUsage {
                    input: event.pointer("/input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                    output: event.pointer("/output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                    input_cached: None,
                });
            }
            _ => {}
        }
    }
    out
}

/// OpenCode and Kilo (a fork of OpenCode, per the original adapter's own
/// docstring) share one event schema across several spellings for the same
/// logical event: `assistant`/`assistant_message`/`message` carry plain text
/// (under `content` or `text`), a bare `text` type carries text nested at
/// `part.text`, `tool_use` carries a tool invocation (name under the
/// top-level `name` or, in the real CLI's shape, `part.tool`; input under
/// `input` or `part.state.input`), and `step_finish` accumulates per-step
/// token/cost totals rather than replacing them (a multi-step run reports
/// one `step_finish` per step).
fn parse_opencode_family(stdout: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    let mut total_input = 0u64;
    let mut total_output = 0u64;
    let mut total_cost = 0f64;
    let mut any_tokens = false;
    let mut any_cost = false;

    for event in json_lines(stdout) {
        match event.get("type").and_then(|v| v.as_str()) {
            Some("assistant") | Some("assistant_message") | Some("message") => {
                let content = event
                    .get("content")
                    .and_then(|v| v.as_str())
                    .or_else(|| event.get("text").and_then(|v| v.as_str()));
                if let Some(content) = content {
                    if !content.is_empty() {
                        out.transcript.push(TranscriptEntry::assistant_text(content));
                    }
                }
            }
            Some("text") => {
                if let Some(text) = event.pointer("/part/text").and_then(|v| v.as_str()) {
                    if !text.is_empty() {
                        out.transcript.push(TranscriptEntry::assistant_text(text));
                    }
                }
            }
            Some("tool_use") => {
                let name = event
                    .get("name")
                    .and_then(|v| v.as_str())
                    .or_else(|| event.pointer("/part/tool").and_then(|v| v.as_str()))
                    .unwrap_or("")
                    .to_string();
                if name.is_empty() {
                    continue;
                }
                let input = event
                    .get("input")
                    .cloned()
                    .or_else(|| event.pointer("/part/state/input").cloned())
                    .unwrap_or(serde_json::Value::Null);
                out.transcript.push(TranscriptEntry::tool_invocation(name, input));
                out.tool_calls_count += 1;
            }
            Some("step_finish") => {
                if let Some(tokens) = event.pointer("/part/tokens") {
                    let input = tokens.get("input").and_then(|v| v.as_u64()).unwrap_or(0);
                    let output = tokens.get("output").and_then(|v| v.as_u64()).unwrap_or(0);
                    if input > 0 || output > 0 {
                        total_input += input;
                        total_output += output;
                        any_tokens = true;
                    }
                }
                if let Some(cost) = event.pointer("/part/cost").and_then(|v| v.as_f64()) {
                    if cost > 0.0 {
                        total_cost += cost;
                        any_cost = true;
                    }
                }
            }
            _ => {}
        }
    }

    if any_tokens {
        out.token_usage = Some(TokenUsage {
            input: total_input,
            output: total_output,
            input_cached: None,
        });
    }
    if any_cost {
        out.cost_usd = Some(total_cost);
    }
    out
}

/// Bob's `--output-format stream-json` events: a `tool_use` event whose
/// `tool_name` is `attempt_completion` is the final answer, not a real tool
/// call — it is unwrapped into a plain assistant-text entry and does not
/// increment `tool_calls_count`. Other `tool_use` events are ordinary tool
/// invocations. Cost is embedded in a free-text `message` event's `content`
/// (`"Cost: 0.0123"`); token usage arrives on a terminal `result` event's
/// `stats`.
fn parse_bob(stdout: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    for event in json_lines(stdout) {
        match event.get("type").and_then(|v| v.as_str()) {
            Some("tool_use") => {
                let tool_name = event.get("tool_name").and_then(|v| v.as_str()).unwrap_or("");
                let params = event.get("parameters").cloned().unwrap_or(serde_json::Value::Null);
                if tool_name == "attempt_completion" {
                    let result_text = params
                        .get("result")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .trim()
                        .to_string();
                    if !result_text.is_empty() {
                        out.transcript.push(TranscriptEntry::assistant_text(result_text));
                    }
                } else {
                    out.transcript.push(TranscriptEntry::tool_invocation(tool_name, params));
                    out.tool_calls_count += 1;
                }
            }
            Some("message") => {
                if let Some(content) = event.get("content").and_then(|v| v.as_str()) {
                    if let Some(cost) = extract_cost(content) {
                        out.cost_usd = Some(cost);
                    }
                }
            }
            Some("result") => {
                let input = event.pointer("/stats/input_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
                let output = event.pointer("/stats/output_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
                if input > 0 || output > 0 {
                    out.token_usage = Some(TokenUsage { input, output, input_cached: None });
                }
            }
            _ => {}
        }
    }
    out
}

/// `"Cost: 0.0123 more text"` -> `Some(0.0123)`; ground truth is Bob's own
/// `re.search(r"Cost:\s*([\d.]+)", content)`.
fn extract_cost(content: &str) -> Option<f64> {
    let idx = content.find("Cost:")?;
    let rest = &content[idx + "Cost:".len()..];
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Copilot, Mistral Vibe and Cline have no structured event stream in the
/// retrieved corpus beyond plain stdout text; the whole buffer becomes a
/// single assistant transcript entry with no token/cost/tool-call data.
fn parse_plain_text(stdout: &str) -> ParsedOutput {
    let mut out = ParsedOutput::default();
    let text = stdout.trim();
    if !text.is_empty() {
        out.transcript.push(TranscriptEntry::assistant_text(text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claude_code_extracts_text_and_tool_use() {
        let stdout = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"},{"type":"tool_use","name":"Write","input":{"path":"a.py"}}]}}
{"type":"result","usage":{"input_tokens":10,"output_tokens":5},"total_cost_usd":0.01}
"#;
        let out = parse_output(AdapterKind::ClaudeCode, stdout);
        assert_eq!(out.transcript.len(), 2);
        assert_eq!(out.tool_calls_count, 1);
        assert_eq!(out.token_usage.unwrap().input, 10);
        assert_eq!(out.cost_usd, Some(0.01));
    }

    #[test]
    fn test_parse_claude_code_skips_unparseable_lines() {
        let stdout = "not json at all\n{\"type\":\"assistant\",\"message\":{\"content\":[{\"type\":\"text\",\"text\":\"ok\"}]}}\n";
        let out = parse_output(AdapterKind::ClaudeCode, stdout);
        assert_eq!(out.transcript.len(), 1);
    }

    #[test]
    fn test_parse_opencode_family_counts_tool_calls() {
        let stdout = r#"{"type":"message","content":"done"}
{"type":"tool_use","name":"bash","input":{"cmd":"ls"}}"#;
        let out = parse_output(AdapterKind::Opencode, stdout);
        assert_eq!(out.tool_calls_count, 1);
        assert_eq!(out.transcript.len(), 2);
    }

    #[test]
    fn test_parse_kilo_shares_opencode_schema() {
        let stdout = r#"{"type":"assistant_message","text":"done"}"#;
        let out = parse_output(AdapterKind::Kilo, stdout);
        assert_eq!(out.transcript.len(), 1);
    }

    #[test]
    fn test_parse_opencode_tool_use_reads_part_tool_fallback() {
        let stdout = r#"{"type":"tool_use","part":{"tool":"bash","state":{"input":{"cmd":"ls"}}}}"#;
        let out = parse_output(AdapterKind::Opencode, stdout);
        assert_eq!(out.tool_calls_count, 1);
        assert_eq!(out.transcript[0].tool_use.as_ref().unwrap().name, "bash");
    }

    #[test]
    fn test_parse_opencode_accumulates_step_finish_tokens_and_cost() {
        let stdout = r#"{"type":"step_finish","part":{"tokens":{"input":10,"output":5},"cost":0.01}}
{"type":"step_finish","part":{"tokens":{"input":3,"output":2},"cost":0.02}}"#;
        let out = parse_output(AdapterKind::Opencode, stdout);
        let usage = out.token_usage.unwrap();
        assert_eq!(usage.input, 13);
        assert_eq!(usage.output, 7);
        assert!((out.cost_usd.unwrap() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_parse_plain_text_for_copilot() {
        let out = parse_output(AdapterKind::Copilot, "  wrote hello.py  \n");
        assert_eq!(out.transcript.len(), 1);
        assert_eq!(out.transcript[0].content, "wrote hello.py");
    }

    #[test]
    fn test_parse_bob_unwraps_attempt_completion_without_counting_tool_call() {
        let stdout = r#"{"type":"tool_use","tool_name":"write_file","parameters":{"path":"a.py"}}
{"type":"tool_use","tool_name":"attempt_completion","parameters":{"result":"done writing a.py"}}
{"type":"result","stats":{"input_tokens":12,"output_tokens":4}}"#;
        let out = parse_output(AdapterKind::Bob, stdout);
        assert_eq!(out.tool_calls_count, 1);
        assert_eq!(out.transcript.len(), 2);
        assert_eq!(out.transcript[1].content, "done writing a.py");
        assert!(out.transcript[1].tool_use.is_none());
        assert_eq!(out.token_usage.unwrap().input, 12);
    }

    #[test]
    fn test_parse_bob_extracts_cost_from_message_text() {
        let stdout = r#"{"type":"message","content":"Turn complete. Cost: 0.0456 USD"}"#;
        let out = parse_output(AdapterKind::Bob, stdout);
        assert_eq!(out.cost_usd, Some(0.0456));
    }

    #[test]
    fn test_parse_bob_empty_stdout_yields_no_transcript() {
        let out = parse_output(AdapterKind::Bob, "   \n");
        assert!(out.transcript.is_empty());
    }

    #[test]
    fn test_parse_codex_token_count_event() {
        let stdout = r#"{"type":"token_count","input_tokens":20,"output_tokens":8}"#;
        let out = parse_output(AdapterKind::Codex, stdout);
        let usage = out.token_usage.unwrap();
        assert_eq!(usage.input, 20);
        assert_eq!(usage.output, 8);
    }
}
