//! `qe-mcp-client` — the uniform external-integration facade.
//!
//! A single [`client::McpClient`] is shared by every concrete client
//! wrapper in [`clients`] (GitHub, Jenkins, filesystem, JIRA,
//! environment). Every call goes through the same health-check → cache →
//! protocol → fallback → metrics path regardless of which service it
//! targets, so the facade — not each client — owns the cache, the health
//! table, and the metrics counters.

pub mod client;
pub mod clients;
pub mod config;
pub mod credential;
pub mod fallback;
pub mod protocol;
pub mod stdio;

pub use client::{cache_key, McpClient, MetricsSnapshot};
pub use clients::{EnvironmentClient, FilesystemClient, GitHubClient, JenkinsClient, JiraClient};
pub use config::{discover_config, resolve_server, to_server_config, to_server_configs, well_known_config_paths, McpConfigFile, McpServerEntry, McpSettings};
pub use credential::{is_valid_token_shape, resolve_github_token, token_info, TokenInfo, TokenSource};
pub use fallback::CliFallbackProvider;
pub use protocol::{FallbackProvider, McpProtocol, NoFallback};
pub use stdio::StdioMcpProtocol;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
