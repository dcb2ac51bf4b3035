use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
    1.0
}

fn default_custom_script_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContainsSpec {
    pub path: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilaritySpec {
    pub actual: String,
    pub expected: String,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomScriptFull {
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub interpreter_args: Vec<String>,
    pub script: String,
    #[serde(default)]
    pub script_args: Vec<String>,
    #[serde(default = "default_custom_script_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub expected_exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomScriptSpec {
    Bare(String),
    Full(CustomScriptFull),
}

impl CustomScriptSpec {
    /// Normalise a bare-path spec into the full shape: `./<path>`, no
    /// interpreter, default timeout and expected exit code.
    pub fn normalized(&self) -> CustomScriptFull {
        match self {
            CustomScriptSpec::Full(spec) => spec.clone(),
            CustomScriptSpec::Bare(path) => {
                let script = if path.starts_with("./") || path.starts_with('/') {
                    path.clone()
                } else {
                    format!("./{path}")
                };
                CustomScriptFull {
                    interpreter: None,
                    interpreter_args: Vec::new(),
                    script,
                    script_args: Vec::new(),
                    timeout: default_custom_script_timeout(),
                    expected_exit_code: 0,
                }
            }
        }
    }
}

macro_rules! assertion_variant {
    ($name:ident, $field:ident, $ty:ty) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub $field: $ty,
            #[serde(default = "default_weight")]
            pub weight: f64,
        }
    };
}

assertion_variant!(FileExistsAssertion, file_exists, String);
assertion_variant!(FileContainsAssertion, file_contains, FileContainsSpec);
assertion_variant!(CommandSucceedsAssertion, command_succeeds, String);
assertion_variant!(CommandFailsAssertion, command_fails, String);
assertion_variant!(CustomScriptAssertion, custom_script, CustomScriptSpec);
assertion_variant!(BleuAssertion, bleu, SimilaritySpec);
assertion_variant!(RougeAssertion, rouge, SimilaritySpec);
assertion_variant!(BertscoreAssertion, bertscore, SimilaritySpec);
assertion_variant!(CosineSimilarityAssertion, cosine_similarity, SimilaritySpec);

/// A single task assertion. Tagged by which single key (besides `weight`) is
/// present in the document; `#[serde(untagged)]` dispatches structurally
/// rather than via an explicit discriminant field, the same closed
/// tagged-variant pattern used for `McpTransport`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionRecord {
    FileExists(FileExistsAssertion),
    FileContains(FileContainsAssertion),
    CommandSucceeds(CommandSucceedsAssertion),
    CommandFails(CommandFailsAssertion),
    CustomScript(CustomScriptAssertion),
    Bleu(BleuAssertion),
    Rouge(RougeAssertion),
    Bertscore(BertscoreAssertion),
    CosineSimilarity(CosineSimilarityAssertion),
}

impl AssertionRecord {
    pub fn weight(&self) -> f64 {
        match self {
            AssertionRecord::FileExists(a) => a.weight,
            AssertionRecord::FileContains(a) => a.weight,
            AssertionRecord::CommandSucceeds(a) => a.weight,
            AssertionRecord::CommandFails(a) => a.weight,
            AssertionRecord::CustomScript(a) => a.weight,
            AssertionRecord::Bleu(a) => a.weight,
            AssertionRecord::Rouge(a) => a.weight,
            AssertionRecord::Bertscore(a) => a.weight,
            AssertionRecord::CosineSimilarity(a) => a.weight,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AssertionRecord::FileExists(_) => "file_exists",
            AssertionRecord::FileContains(_) => "file_contains",
            AssertionRecord::CommandSucceeds(_) => "command_succeeds",
            AssertionRecord::CommandFails(_) => "command_fails",
            AssertionRecord::CustomScript(_) => "custom_script",
            AssertionRecord::Bleu(_) => "bleu",
            AssertionRecord::Rouge(_) => "rouge",
            AssertionRecord::Bertscore(_) => "bertscore",
            AssertionRecord::CosineSimilarity(_) => "cosine_similarity",
        }
    }
}
