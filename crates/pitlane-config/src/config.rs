use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use pitlane_core::types::{AdapterKind, McpTransportKind};
use pitlane_core::{PitlaneError, Result};
use serde::{Deserialize, Serialize};

use crate::assertion::AssertionRecord;
use crate::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillRefRaw {
    Source(String),
    Full { source: String, skill: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRef {
    pub source: String,
    #[serde(default)]
    pub skill: Option<String>,
}

impl From<SkillRefRaw> for SkillRef {
    fn from(raw: SkillRefRaw) -> Self {
        match raw {
            SkillRefRaw::Source(source) => SkillRef { source, skill: None },
            SkillRefRaw::Full { source, skill } => SkillRef { source, skill },
        }
    }
}

fn deserialize_skills<'de, D>(deserializer: D) -> std::result::Result<Vec<SkillRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<SkillRefRaw> = Deserialize::deserialize(deserializer)?;
    Ok(raw.into_iter().map(SkillRef::from).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub transport: McpTransportKind,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl McpServerRecord {
    /// `${VAR}`/`${VAR:-default}` references in `env` values with no default
    /// and not present in `environ`, formatted `<assistant> -> mcp '<name>':
    /// ${VAR}`.
    pub fn missing_env_vars(&self, assistant_name: &str, environ: &HashMap<String, String>) -> Vec<String> {
        let mut missing = Vec::new();
        for value in self.env.values() {
            for var in env::missing_vars(value, environ) {
                missing.push(format!("  {assistant_name} -> mcp '{}': ${{{var}}}", self.name));
            }
        }
        missing
    }

    /// Env map with every `${VAR}`/`${VAR:-default}` reference expanded
    /// against `environ`, applied at write time (when the adapter writes the
    /// MCP config file into the workspace).
    pub fn expanded_env(&self, environ: &HashMap<String, String>) -> IndexMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), env::expand(v, environ)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub adapter: AdapterKind,
    #[serde(default)]
    pub args: IndexMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_skills")]
    pub skills: Vec<SkillRef>,
    #[serde(default)]
    pub mcps: Vec<McpServerRecord>,
}

fn default_task_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    pub prompt: String,
    pub workdir: String,
    #[serde(default = "default_task_timeout")]
    pub timeout: u64,
    pub assertions: Vec<AssertionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub assistants: IndexMap<String, AssistantConfig>,
    pub tasks: Vec<TaskConfig>,
}

impl EvalConfig {
    /// Cross-field validation run right after deserialisation, aggregating
    /// every violation it can find into a single error that lists every
    /// offender rather than stopping at the first one.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.assistants.is_empty() {
            problems.push("assistants must not be empty".to_string());
        }
        if self.tasks.is_empty() {
            problems.push("tasks must not be empty".to_string());
        }
        for name in self.assistants.keys() {
            if name.contains(',') {
                problems.push(format!(
                    "assistant name '{name}' must not contain a comma"
                ));
            }
        }
        for task in &self.tasks {
            if task.assertions.is_empty() {
                problems.push(format!("task '{}': assertions must not be empty", task.name));
            }
        }

        if !problems.is_empty() {
            return Err(PitlaneError::ConfigInvalid(problems.join("\n")));
        }
        Ok(())
    }

    /// Every `${VAR}` MCP env reference across every assistant that has no
    /// default and is unset in `environ`, aggregated into one error.
    pub fn validate_mcp_env(&self, environ: &HashMap<String, String>) -> Result<()> {
        let mut missing = Vec::new();
        for (name, assistant) in &self.assistants {
            for mcp in &assistant.mcps {
                missing.extend(mcp.missing_env_vars(name, environ));
            }
        }
        if !missing.is_empty() {
            return Err(PitlaneError::MissingMcpEnv(missing.join("\n")));
        }
        Ok(())
    }
}

/// Load and validate an eval config document from `path`. Relative
/// `workdir` paths are resolved against the directory containing the config
/// file.
pub fn load_config(path: &Path) -> Result<EvalConfig> {
    if !path.exists() {
        return Err(PitlaneError::ConfigNotFound(path.to_path_buf()));
    }
    let config_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let config_dir = std::fs::canonicalize(&config_dir).unwrap_or(config_dir);

    let raw = std::fs::read_to_string(path)?;
    let mut config: EvalConfig =
        serde_yaml::from_str(&raw).map_err(|e| PitlaneError::ConfigParse(e.to_string()))?;

    config.validate()?;

    for task in &mut config.tasks {
        let workdir_path = PathBuf::from(&task.workdir);
        if !workdir_path.is_absolute() {
            task.workdir = config_dir.join(workdir_path).to_string_lossy().into_owned();
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_YAML: &str = r#"
assistants:
  claude:
    adapter: claude-code
tasks:
  - name: hello-world
    prompt: "write hello.py"
    workdir: "./fixtures/hello"
    assertions:
      - file_exists: hello.py
"#;

    #[test]
    fn test_load_config_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(&path, MINIMAL_YAML).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.assistants.len(), 1);
        assert_eq!(config.tasks[0].timeout, 300);
        assert!(config.tasks[0].workdir.ends_with("fixtures/hello"));
        assert!(Path::new(&config.tasks[0].workdir).is_absolute());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/eval.yaml")).unwrap_err();
        assert!(matches!(err, PitlaneError::ConfigNotFound(_)));
    }

    #[test]
    fn test_validate_rejects_comma_in_assistant_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        let yaml = MINIMAL_YAML.replace("claude:", "claude,code:");
        std::fs::write(&path, &yaml).unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, PitlaneError::ConfigInvalid(_)));
    }

    #[test]
    fn test_validate_rejects_empty_assertions() {
        let yaml = MINIMAL_YAML.replace("assertions:\n      - file_exists: hello.py", "assertions: []");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, PitlaneError::ConfigInvalid(_)));
    }

    #[test]
    fn test_skill_ref_normalizes_bare_string() {
        let yaml = "- some/skill\n- source: other/skill\n  skill: specific\n";
        let raw: Vec<SkillRefRaw> = serde_yaml::from_str(yaml).unwrap();
        let skills: Vec<SkillRef> = raw.into_iter().map(SkillRef::from).collect();
        assert_eq!(skills[0].source, "some/skill");
        assert_eq!(skills[0].skill, None);
        assert_eq!(skills[1].skill.as_deref(), Some("specific"));
    }

    #[test]
    fn test_mcp_server_missing_env_vars_formats_assistant_and_name() {
        let record = McpServerRecord {
            name: "weather".to_string(),
            transport: McpTransportKind::Stdio,
            command: None,
            args: vec![],
            url: None,
            env: IndexMap::from([("API_KEY".to_string(), "${WEATHER_KEY}".to_string())]),
        };
        let missing = record.missing_env_vars("bob", &HashMap::new());
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("bob"));
        assert!(missing[0].contains("weather"));
        assert!(missing[0].contains("WEATHER_KEY"));
    }

    #[test]
    fn test_validate_mcp_env_ok_when_no_mcps_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(&path, MINIMAL_YAML).unwrap();
        let config = load_config(&path).unwrap();
        assert!(config.validate_mcp_env(&HashMap::new()).is_ok());
    }
}
