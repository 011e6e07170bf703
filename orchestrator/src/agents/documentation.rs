//! Agent B — Documentation Intelligence.
//!
//! Runs in Phase 2 alongside Agent C. Searches the repository's filesystem
//! (via the MCP filesystem client, same uniform facade as every other
//! external call) for documentation relevant to the ticket's component,
//! then reads the best match. Grounded on spec §4.3's representative
//! `FilesystemSearchFiles`/`FilesystemReadFile` operations.

use std::time::Instant;

use async_trait::async_trait;
use qe_core::{AgentResult, ExecutionStatus};
use qe_evidence::quick_confidence;
use qe_mcp_client::FilesystemClient;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentContext};

const MAX_SEARCH_RESULTS: u32 = 5;

pub struct DocumentationAgent {
    client: FilesystemClient,
}

impl DocumentationAgent {
    pub fn new(client: FilesystemClient) -> Self {
        Self { client }
    }

    /// The component named by Agent A's JIRA findings, if carried forward
    /// in the phase-2 upstream bundle; falls back to a generic glob.
    fn search_pattern(ctx: &AgentContext) -> String {
        ctx.upstream_findings("agent_a_jira_intelligence")
            .get("jira_info")
            .and_then(|j| j.get("component"))
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty() && *c != "Unknown")
            .map(|c| format!("**/*{}*.md", c.to_lowercase()))
            .unwrap_or_else(|| "**/*.md".to_string())
    }
}

#[async_trait]
impl Agent for DocumentationAgent {
    fn agent_id(&self) -> &str {
        "agent_b_documentation"
    }

    fn name(&self) -> &str {
        "Agent B - Documentation Intelligence"
    }

    async fn run(&self, ctx: &AgentContext) -> AgentResult {
        let start = Instant::now();
        ctx.hub.update_agent_status(self.agent_id(), "active");

        let pattern = Self::search_pattern(ctx);
        let search = self.client.search_files(&pattern, MAX_SEARCH_RESULTS).await;
        if !search.success {
            ctx.hub.update_agent_status(self.agent_id(), "failed");
            let mut failed = AgentResult::failed(
                self.agent_id(),
                self.name(),
                search.error_message.unwrap_or_else(|| "documentation search failed".to_string()),
            );
            failed.execution_time = start.elapsed();
            return failed;
        }

        let matched_files: Vec<String> = search
            .data
            .get("matches")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let mut excerpt = None;
        if let Some(first) = matched_files.first() {
            let read = self.client.read_file(first).await;
            if read.success {
                excerpt = read.data.get("content").and_then(Value::as_str).map(|s| s.chars().take(2000).collect::<String>());
            }
        }

        ctx.hub.update_agent_status(self.agent_id(), "completed");

        let confidence = quick_confidence(0.6, !matched_files.is_empty());

        AgentResult {
            agent_id: self.agent_id().to_string(),
            name: self.name().to_string(),
            status: ExecutionStatus::Success,
            findings: json!({
                "documentation": {
                    "search_pattern": pattern,
                    "matched_files": matched_files,
                    "excerpt": excerpt,
                },
            }),
            confidence,
            execution_time: start.elapsed(),
            output_file: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use qe_core::{QeError, Result as QeResult, ServerStatus};
    use qe_hub::CommunicationHub;
    use qe_mcp_client::{FallbackProvider, McpClient, McpProtocol, McpSettings};
    use std::sync::Arc;

    struct ScriptedFs;
    #[at]
    impl McpProtocol for ScriptedFs {
        async fn call(&self, _server_id: &str, operation: &str, _args: &Value) -> QeResult<Value> {
            match operation {
                "filesystem_search_files" => Ok(json!({"matches": ["docs/cluster-curator.md"]})),
                "filesystem_read_file" => Ok(json!({"content": "# ClusterCurator\nDigest-based upgrades."})),
                _ => Ok(Value::Null),
            }
        }
        async fn health_check(&self, _server_id: &str) -> ServerStatus {
            ServerStatus::Available
        }
    }

    struct Unreachable;
    #[at]
    impl McpProtocol for Unreachable {
        async fn call(&self, _server_id: &str, _operation: &str, _args: &Value) -> QeResult<Value> {
            Err(QeError::TransientExternal("fs unreachable".into()))
        }
        async fn health_check(&self, _server_id: &str) -> ServerStatus {
            ServerStatus::Unavailable
        }
    }

    struct NoFallback;
    #[at]
    impl FallbackProvider for NoFallback {
        async fn fallback(&self, _operation: &str, _args: &Value) -> Option<Value> {
            None
        }
    }

    fn context(mcp: Arc<McpClient>, upstream: Value) -> AgentContext {
        let hub = CommunicationHub::new("phase_2", "run_test");
        AgentContext {
            run_id: "run_test".into(),
            jira_id: "ACM-22079".into(),
            mcp,
            hub,
            upstream,
        }
    }

    #[tokio::test]
    async fn finds_and_reads_matching_documentation() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(ScriptedFs), Arc::new(NoFallback)));
        let ctx = context(
            mcp,
            json!({"agent_a_jira_intelligence": {"jira_info": {"component": "ClusterCurator"}}}),
        );
        let agent = DocumentationAgent::new(FilesystemClient::new(ctx.mcp.clone(), "filesystem"));
        let result = agent.run(&ctx).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.findings["documentation"]["matched_files"], json!(["docs/cluster-curator.md"]));
        assert!(result.findings["documentation"]["excerpt"].as_str().unwrap().contains("ClusterCurator"));
    }

    #[tokio::test]
    async fn falls_back_to_generic_pattern_without_component_hint() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(ScriptedFs), Arc::new(NoFallback)));
        let ctx = context(mcp, Value::Null);
        let agent = DocumentationAgent::new(FilesystemClient::new(ctx.mcp.clone(), "filesystem"));
        let result = agent.run(&ctx).await;
        assert_eq!(result.findings["documentation"]["search_pattern"], json!("**/*.md"));
    }

    #[tokio::test]
    async fn unreachable_filesystem_service_yields_failed_result() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(Unreachable), Arc::new(NoFallback)));
        let ctx = context(mcp, Value::Null);
        let agent = DocumentationAgent::new(FilesystemClient::new(ctx.mcp.clone(), "filesystem"));
        let result = agent.run(&ctx).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
    }
}
