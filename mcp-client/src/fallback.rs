//! Direct-CLI fallback paths used when an MCP server is unavailable or a
//! protocol call fails. Grounded on the original Jenkins MCP client's
//! `_make_api_request`, which shells out to `curl` when the MCP server
//! itself cannot be reached, and on the general "fallback is a non-protocol
//! path such as a CLI" rule from the platform's external-interface design.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tokio::time::timeout;

use crate::protocol::FallbackProvider;

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches known operations to a direct CLI invocation: `gh` for GitHub
/// reads, `find`/`cat` for filesystem reads. Operations it does not
/// recognize fall through to `None`, signalling "no fallback available"
/// to the facade.
pub struct CliFallbackProvider;

impl CliFallbackProvider {
    async fn run(command: &str, args: &[&str]) -> Option<String> {
        let result = timeout(FALLBACK_TIMEOUT, Command::new(command).args(args).output()).await;
        match result {
            Ok(Ok(output)) if output.status.success() => String::from_utf8(output.stdout).ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl FallbackProvider for CliFallbackProvider {
    async fn fallback(&self, operation: &str, args: &Value) -> Option<Value> {
        match operation {
            "github_get_pull_request" => {
                let repo = args.get("repo")?.as_str()?;
                let number = args.get("number")?.to_string();
                let stdout = Self::run("gh", &["pr", "view", &number, "--repo", repo, "--json", "number,title,state,url"]).await?;
                serde_json::from_str(&stdout).ok()
            }
            "github_search_repositories" => {
                let query = args.get("query")?.as_str()?;
                let stdout = Self::run("gh", &["search", "repos", query, "--json", "fullName,description,url"]).await?;
                serde_json::from_str::<Value>(&stdout).ok().map(|v| json!({ "results": v }))
            }
            "filesystem_read_file" => {
                let path = args.get("path")?.as_str()?;
                let contents = tokio::fs::read_to_string(path).await.ok()?;
                Some(json!({ "path": path, "content": contents }))
            }
            "filesystem_search_files" => {
                let pattern = args.get("pattern")?.as_str()?;
                let stdout = Self::run("find", &[".", "-name", pattern]).await?;
                let matches: Vec<&str> = stdout.lines().collect();
                Some(json!({ "matches": matches }))
            }
            _ => None,
        }
    }
}
