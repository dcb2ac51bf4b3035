pub mod assertion;
pub mod config;
pub mod env;

pub use assertion::{
    AssertionRecord, BertscoreAssertion, BleuAssertion, CommandFailsAssertion,
    CommandSucceedsAssertion, CosineSimilarityAssertion, CustomScriptAssertion,
    CustomScriptFull, CustomScriptSpec, FileContainsAssertion, FileContainsSpec,
    FileExistsAssertion, RougeAssertion, SimilaritySpec,
};
pub use config::{
    load_config, AssistantConfig, EvalConfig, McpServerRecord, SkillRef, TaskConfig,
};
