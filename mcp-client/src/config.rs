//! MCP server configuration discovery and parsing.
//!
//! Mirrors the well-known config file search used by the original Jenkins
//! MCP client: a small set of standard paths, the first one that parses
//! wins. `~/.claude/mcp.json` is checked last so a project-local
//! `.cursor` config takes priority if both exist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use qe_core::{QeError, Result, ServerConfig, TransportKind};
use serde::{Deserialize, Serialize};

/// One entry under `mcpServers` in the MCP config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerEntry {
    #[serde(rename = "type")]
    pub transport_type: String,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub url: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSettings {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u64,
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    #[serde(default = "default_true")]
    pub enable_cache: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
}

fn default_cache_ttl() -> u64 {
    300
}
fn default_health_check_interval() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> f64 {
    1.0
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            cache_ttl: default_cache_ttl(),
            health_check_interval: default_health_check_interval(),
            enable_fallback: default_true(),
            enable_cache: default_true(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpConfigFile {
    #[serde(default, rename = "mcpServers")]
    pub mcp_servers: HashMap<String, McpServerEntry>,
    #[serde(default)]
    pub settings: McpSettings,
}

/// Standard well-known locations searched for an MCP config file, in
/// priority order.
pub fn well_known_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        paths.push(home.join(".cursor").join("mcp.json"));
        paths.push(home.join(".config").join("cursor").join("mcp.json"));
        paths.push(home.join(".claude").join("mcp.json"));
    }
    paths
}

/// Load and parse the first well-known config path that exists and parses
/// successfully. Returns `None` (not an error) if none is found, mirroring
/// the original client's graceful "MCP not configured" behavior.
pub fn discover_config() -> Option<McpConfigFile> {
    for path in well_known_config_paths() {
        if let Some(config) = load_config_file(&path) {
            return Some(config);
        }
    }
    None
}

fn load_config_file(path: &Path) -> Option<McpConfigFile> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse MCP config file");
            None
        }
    }
}

/// Resolve a server entry by canonical name, trying known alternate names
/// for well-known servers (the original client accepts `jenkins`,
/// `jenkins-server`, `Jenkins`, `jenkins-mcp` for the same purpose).
pub fn resolve_server<'a>(config: &'a McpConfigFile, canonical_name: &str, alternates: &[&str]) -> Option<&'a McpServerEntry> {
    if let Some(entry) = config.mcp_servers.get(canonical_name) {
        return Some(entry);
    }
    alternates.iter().find_map(|name| config.mcp_servers.get(*name))
}

/// Convert a parsed config file entry into the core [`ServerConfig`] the
/// client dispatches against. An unrecognized `type` falls back to `Stdio`
/// with no command, which simply leaves the server permanently
/// unavailable rather than failing config load over one bad entry.
pub fn to_server_config(server_id: &str, entry: &McpServerEntry) -> ServerConfig {
    let transport = match entry.transport_type.as_str() {
        "http" | "sse" => TransportKind::Http,
        _ => TransportKind::Stdio,
    };
    ServerConfig {
        server_id: server_id.to_string(),
        transport,
        command: entry.command.clone(),
        args: entry.args.clone(),
        url: entry.url.clone(),
        credential_ref: None,
    }
}

/// Convert every entry in a parsed config file into the `server_id ->
/// ServerConfig` map [`crate::McpClient::new`] expects.
pub fn to_server_configs(config: &McpConfigFile) -> HashMap<String, ServerConfig> {
    config.mcp_servers.iter().map(|(id, entry)| (id.clone(), to_server_config(id, entry))).collect()
}

/// Parse a `Basic` auth header into `(username, token)`.
pub fn parse_basic_auth_header(header: &str) -> Result<(String, String)> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or_else(|| QeError::Credential("auth header is not a Basic auth header".into()))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| QeError::Credential(format!("failed to decode auth header: {e}")))?;
    let decoded = String::from_utf8(decoded).map_err(|e| QeError::Credential(format!("auth header is not valid utf-8: {e}")))?;
    let (username, token) = decoded
        .split_once(':')
        .ok_or_else(|| QeError::Credential("auth header did not contain a ':' separator".into()))?;
    Ok((username.to_string(), token.to_string()))
}
