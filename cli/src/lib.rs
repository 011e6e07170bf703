//! `qe-cli` — shared plumbing for the `qe-generate` and `qe-analyze`
//! binaries: configuration loading, telemetry init, and MCP facade
//! construction from whatever config file `qe-mcp-client` discovers.
//! Report prose and CLI argument parsing for individual flags live in the
//! binaries themselves; this crate only holds what both share.

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use qe_mcp_client::{discover_config, to_server_configs, CliFallbackProvider, McpClient, McpSettings, StdioMcpProtocol};

/// Builds the shared MCP facade from the first well-known config file
/// found on disk (spec §6 "MCP configuration"), or an empty server table
/// if none is configured — every call then falls through to the CLI
/// fallback path, which is how the platform runs with no MCP servers
/// installed at all.
pub fn build_mcp_client() -> Arc<McpClient> {
    let (servers, settings) = match discover_config() {
        Some(file) => (to_server_configs(&file), file.settings.clone()),
        None => (Default::default(), McpSettings::default()),
    };

    let protocol = Arc::new(StdioMcpProtocol::new(servers.clone()));
    Arc::new(McpClient::new(servers, settings, protocol, Arc::new(CliFallbackProvider)))
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
