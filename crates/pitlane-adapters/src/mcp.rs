use std::collections::HashMap;
use std::path::Path;

use pitlane_config::McpServerRecord;
use pitlane_core::types::{AdapterKind, McpTransportKind};

/// Write `mcp` into the adapter-specific config file under `workspace`,
/// merging with whatever is already there so repeated calls (one per
/// configured MCP server) accumulate entries instead of clobbering them.
pub fn install_mcp(
    kind: AdapterKind,
    workspace: &Path,
    mcp: &McpServerRecord,
    environ: &HashMap<String, String>,
) -> anyhow::Result<()> {
    match kind {
        AdapterKind::ClaudeCode => write_json_mcp_servers(&workspace.join(".mcp.json"), mcp, environ),
        AdapterKind::Bob => write_json_mcp_servers(&workspace.join(".bob/mcp.json"), mcp, environ),
        AdapterKind::Gemini => write_json_mcp_servers(&workspace.join(".gemini/settings.json"), mcp, environ),
        AdapterKind::Copilot => {
            write_json_mcp_servers(&workspace.join(crate::commands::MCP_FILENAME_COPILOT), mcp, environ)
        }
        AdapterKind::Codex => write_codex_toml(&workspace.join(".codex/config.toml"), mcp, environ),
        AdapterKind::Kilo => write_local_style_mcp(&workspace.join("kilo.json"), mcp, environ),
        AdapterKind::Opencode => write_local_style_mcp(&workspace.join("opencode.json"), mcp, environ),
        // Extrapolated from the other adapters' own conventions; neither CLI
        // appears in the retrieved corpus beyond its argv.
        AdapterKind::MistralVibe => write_json_mcp_servers(&workspace.join(".vibe/mcp.json"), mcp, environ),
        AdapterKind::Cline => write_json_mcp_servers(&workspace.join(".cline/mcp.json"), mcp, environ),
    }
}

fn load_json_object(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_str::<serde_json::Value>(&raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn write_json_object(path: &Path, value: &serde_json::Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = serde_json::to_string_pretty(value)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

/// The `{"mcpServers": {name: {...}}}` shape shared by Claude Code, Bob,
/// Gemini, Copilot, and the two extrapolated adapters.
fn write_json_mcp_servers(
    path: &Path,
    mcp: &McpServerRecord,
    environ: &HashMap<String, String>,
) -> anyhow::Result<()> {
    let mut root = load_json_object(path)?;
    let servers = root
        .entry("mcpServers")
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    let serde_json::Value::Object(servers) = servers else {
        anyhow::bail!("{}: 'mcpServers' is not an object", path.display());
    };
    servers.insert(mcp.name.clone(), mcp_server_entry(mcp, environ));
    write_json_object(path, &serde_json::Value::Object(root))
}

fn mcp_server_entry(mcp: &McpServerRecord, environ: &HashMap<String, String>) -> serde_json::Value {
    let mut entry = serde_json::Map::new();
    match mcp.transport {
        McpTransportKind::Stdio => {
            if let Some(command) = &mcp.command {
                entry.insert("command".to_string(), serde_json::json!(command));
            }
            entry.insert("args".to_string(), serde_json::json!(mcp.args));
        }
        McpTransportKind::Sse => {
            entry.insert("type".to_string(), serde_json::json!("sse"));
            if let Some(url) = &mcp.url {
                entry.insert("url".to_string(), serde_json::json!(url));
            }
        }
        McpTransportKind::Http => {
            entry.insert("type".to_string(), serde_json::json!("http"));
            if let Some(url) = &mcp.url {
                entry.insert("url".to_string(), serde_json::json!(url));
            }
        }
    }
    let env = mcp.expanded_env(environ);
    if !env.is_empty() {
        entry.insert("env".to_string(), serde_json::json!(env));
    }
    serde_json::Value::Object(entry)
}

/// OpenCode and Kilo's `{"mcp": {name: {"type":"local","command":[...],
/// "environment":{...},"enabled":true,"url"?:...}}}` shape (kilo.json mirrors
/// opencode.json verbatim per the original adapter's own comment).
fn write_local_style_mcp(
    path: &Path,
    mcp: &McpServerRecord,
    environ: &HashMap<String, String>,
) -> anyhow::Result<()> {
    let mut root = load_json_object(path)?;
    let entries = root
        .entry("mcp")
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    let serde_json::Value::Object(entries) = entries else {
        anyhow::bail!("{}: 'mcp' is not an object", path.display());
    };

    let mut full_command = Vec::new();
    if let Some(command) = &mcp.command {
        full_command.push(command.clone());
    }
    full_command.extend(mcp.args.iter().cloned());

    let mut entry = serde_json::Map::new();
    entry.insert("type".to_string(), serde_json::json!("local"));
    entry.insert("command".to_string(), serde_json::json!(full_command));
    entry.insert("environment".to_string(), serde_json::json!(mcp.expanded_env(environ)));
    entry.insert("enabled".to_string(), serde_json::json!(true));
    if let Some(url) = &mcp.url {
        entry.insert("url".to_string(), serde_json::json!(url));
    }

    entries.insert(mcp.name.clone(), serde_json::Value::Object(entry));
    write_json_object(path, &serde_json::Value::Object(root))
}

/// Codex reads its MCP servers from `.codex/config.toml` under
/// `[mcp_servers.<name>]` tables.
fn write_codex_toml(path: &Path, mcp: &McpServerRecord, environ: &HashMap<String, String>) -> anyhow::Result<()> {
    let mut root: toml::Value = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        raw.parse().unwrap_or(toml::Value::Table(toml::value::Table::new()))
    } else {
        toml::Value::Table(toml::value::Table::new())
    };

    let root_table = root
        .as_table_mut()
        .expect("root constructed as a Table above");
    let servers = root_table
        .entry("mcp_servers")
        .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    let toml::Value::Table(servers) = servers else {
        anyhow::bail!("{}: 'mcp_servers' is not a table", path.display());
    };

    let mut entry = toml::value::Table::new();
    if let Some(command) = &mcp.command {
        entry.insert("command".to_string(), toml::Value::String(command.clone()));
    }
    entry.insert(
        "args".to_string(),
        toml::Value::Array(mcp.args.iter().map(|a| toml::Value::String(a.clone())).collect()),
    );
    let env = mcp.expanded_env(environ);
    if !env.is_empty() {
        let mut env_table = toml::value::Table::new();
        for (k, v) in env {
            env_table.insert(k, toml::Value::String(v));
        }
        entry.insert("env".to_string(), toml::Value::Table(env_table));
    }

    servers.insert(mcp.name.clone(), toml::Value::Table(entry));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(&root)?)?;
    Ok(())
}
