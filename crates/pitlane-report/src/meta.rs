//! C9 (part) — `meta.yaml`: run-level metadata with a stable key set,
//! written once by the orchestrator thread after every unit has resolved.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub timestamp: String,
    pub assistants: Vec<String>,
    pub tasks: Vec<String>,
    pub cli_versions: IndexMap<String, String>,
    pub pitlane_version: String,
    pub repeat: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

pub fn write_meta(path: &Path, meta: &RunMeta) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = serde_yaml::to_string(meta)?;
    std::fs::write(path, rendered)?;
    Ok(())
}
