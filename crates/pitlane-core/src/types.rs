use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The closed set of assistant CLIs a task can be run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum AdapterKind {
    Bob,
    ClaudeCode,
    Codex,
    Copilot,
    Gemini,
    Kilo,
    MistralVibe,
    Opencode,
    Cline,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 9] = [
        AdapterKind::Bob,
        AdapterKind::ClaudeCode,
        AdapterKind::Codex,
        AdapterKind::Copilot,
        AdapterKind::Gemini,
        AdapterKind::Kilo,
        AdapterKind::MistralVibe,
        AdapterKind::Opencode,
        AdapterKind::Cline,
    ];

    /// The tag as it appears in the eval document's `adapter:` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Bob => "bob",
            AdapterKind::ClaudeCode => "claude-code",
            AdapterKind::Codex => "codex",
            AdapterKind::Copilot => "copilot",
            AdapterKind::Gemini => "gemini",
            AdapterKind::Kilo => "kilo",
            AdapterKind::MistralVibe => "mistral-vibe",
            AdapterKind::Opencode => "opencode",
            AdapterKind::Cline => "cline",
        }
    }

    pub fn parse(s: &str) -> Option<AdapterKind> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional capabilities a given adapter implementation supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterFeature {
    Mcps,
    Skills,
}

/// Transport kind an MCP server is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    #[default]
    Stdio,
    Sse,
    Http,
}

/// One entry of an assistant's normalised transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<ToolUse>,
}

impl TranscriptEntry {
    pub fn assistant_text(content: impl Into<String>) -> Self {
        TranscriptEntry {
            role: "assistant".to_string(),
            content: content.into(),
            tool_use: None,
        }
    }

    pub fn tool_invocation(name: impl Into<String>, input: serde_json::Value) -> Self {
        TranscriptEntry {
            role: "assistant".to_string(),
            content: String::new(),
            tool_use: Some(ToolUse {
                name: name.into(),
                input,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub name: String,
    pub input: serde_json::Value,
}

/// Token usage as reported by an assistant's own event stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cached: Option<u64>,
}

/// The normalised output of a single assistant invocation. Constructed exactly
/// once by the adapter from the parsed event stream; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_seconds: f64,
    pub transcript: Vec<TranscriptEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    pub tool_calls_count: u32,
    pub timed_out: bool,
}

impl AssistantResult {
    /// The shape returned when the adapter fails to launch the child at all
    /// (binary missing, spawn error): empty transcript, exit_code -1, the
    /// exception text in stderr.
    pub fn launch_failure(message: impl Into<String>, duration_seconds: f64) -> Self {
        AssistantResult {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: -1,
            duration_seconds,
            transcript: Vec::new(),
            token_usage: None,
            cost_usd: None,
            tool_calls_count: 0,
            timed_out: false,
        }
    }
}

/// Result of evaluating a single assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub score: f64,
    pub weight: f64,
}

/// Metrics collected for a single unit (assistant x task x iteration). Kept as
/// a flat numeric map so the aggregator can fold an arbitrary metric name
/// without the data model growing a field per metric.
pub type MetricsMap = IndexMap<String, Option<f64>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationResult {
    pub metrics: MetricsMap,
    pub assertions: Vec<AssertionResult>,
    pub all_passed: bool,
    pub iteration_index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionSummary {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatSummary {
    pub count: u32,
    pub all_passed_count: u32,
    pub all_passed_rate: f64,
    pub iterations: Vec<IterationResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub metrics: MetricsMap,
    pub metrics_stats: IndexMap<String, MetricStatistics>,
    pub assertions: Vec<AssertionSummary>,
    pub all_passed: bool,
    pub repeat: RepeatSummary,
}
