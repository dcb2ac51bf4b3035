#[derive(thiserror::Error, Debug)]
pub enum PitlaneError {
    #[error("config file not found: {0}")]
    ConfigNotFound(std::path::PathBuf),

    #[error("failed to parse eval config: {0}")]
    ConfigParse(String),

    #[error("invalid eval config:\n{0}")]
    ConfigInvalid(String),

    #[error("unknown adapter '{0}'")]
    UnknownAdapter(String),

    #[error("unknown assertion kind '{0}'")]
    UnknownAssertionKind(String),

    #[error("missing environment variables required by MCP servers:\n{0}")]
    MissingMcpEnv(String),

    #[error("skill installation failed for '{0}': {1}")]
    SkillInstallFailed(String, String),

    #[error("skill installation timed out after {0}s for '{1}'")]
    SkillInstallTimeout(u64, String),

    #[error("duplicate unit logger name '{0}': two units would mix into one log")]
    DuplicateUnitLogger(String),

    #[error("workspace source directory not found: {0}")]
    WorkspaceSourceNotFound(std::path::PathBuf),

    #[error("failed to install MCP server '{0}' for unit: {1}")]
    McpInstallFailed(String, String),

    #[error("cancelled before starting: interrupt was received while queued")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PitlaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_config_not_found() {
        let err = PitlaneError::ConfigNotFound("eval.yaml".into());
        assert_eq!(err.to_string(), "config file not found: eval.yaml");
    }

    #[test]
    fn test_display_config_parse() {
        let err = PitlaneError::ConfigParse("bad indentation".into());
        assert_eq!(
            err.to_string(),
            "failed to parse eval config: bad indentation"
        );
    }

    #[test]
    fn test_display_config_invalid() {
        let err = PitlaneError::ConfigInvalid("assistants must not be empty".into());
        assert_eq!(
            err.to_string(),
            "invalid eval config:\nassistants must not be empty"
        );
    }

    #[test]
    fn test_display_unknown_adapter() {
        let err = PitlaneError::UnknownAdapter("chatgpt".into());
        assert_eq!(err.to_string(), "unknown adapter 'chatgpt'");
    }

    #[test]
    fn test_display_unknown_assertion_kind() {
        let err = PitlaneError::UnknownAssertionKind("regex_match".into());
        assert_eq!(err.to_string(), "unknown assertion kind 'regex_match'");
    }

    #[test]
    fn test_display_missing_mcp_env() {
        let err = PitlaneError::MissingMcpEnv("  bob -> mcp 'x': ${API_KEY}".into());
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_display_skill_install_failed() {
        let err = PitlaneError::SkillInstallFailed("my-skill".into(), "exit 1".into());
        assert_eq!(
            err.to_string(),
            "skill installation failed for 'my-skill': exit 1"
        );
    }

    #[test]
    fn test_display_skill_install_timeout() {
        let err = PitlaneError::SkillInstallTimeout(30, "my-skill".into());
        assert_eq!(
            err.to_string(),
            "skill installation timed out after 30s for 'my-skill'"
        );
    }

    #[test]
    fn test_display_duplicate_unit_logger() {
        let err = PitlaneError::DuplicateUnitLogger("claude_hello_iter0".into());
        assert!(err.to_string().contains("claude_hello_iter0"));
    }

    #[test]
    fn test_display_mcp_install_failed() {
        let err = PitlaneError::McpInstallFailed("filesystem".into(), "connection refused".into());
        assert_eq!(
            err.to_string(),
            "failed to install MCP server 'filesystem' for unit: connection refused"
        );
    }

    #[test]
    fn test_display_cancelled() {
        let err = PitlaneError::Cancelled;
        assert!(err.to_string().contains("interrupt"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PitlaneError>();
    }
}
