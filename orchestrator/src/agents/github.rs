//! Agent C — GitHub Intelligence.
//!
//! Runs in Phase 2 alongside Agent B. If Agent A (Phase 1) discovered a
//! linked pull request, fetches it directly; otherwise falls back to a
//! repository search keyed on the ticket's component. Grounded on spec
//! §4.3's `GitHubGetPullRequest`/`GitHubSearchRepositories` operations.

use std::time::Instant;

use async_trait::async_trait;
use qe_core::{AgentResult, ExecutionStatus};
use qe_evidence::quick_confidence;
use qe_mcp_client::GitHubClient;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentContext};

const SEARCH_LIMIT: u32 = 10;

pub struct GitHubAgent {
    client: GitHubClient,
}

impl GitHubAgent {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    fn pr_hint(ctx: &AgentContext) -> Option<(String, u64)> {
        let pr_details = ctx.upstream_findings("agent_a_jira_intelligence").get("pr_details")?;
        let repository = pr_details.get("repository").and_then(Value::as_str)?.to_string();
        let number = pr_details
            .get("pr_number")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))?;
        Some((repository, number))
    }

    fn component_query(ctx: &AgentContext) -> String {
        ctx.upstream_findings("agent_a_jira_intelligence")
            .get("jira_info")
            .and_then(|j| j.get("component"))
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty() && *c != "Unknown")
            .map(str::to_string)
            .unwrap_or_else(|| ctx.jira_id.clone())
    }
}

#[async_trait]
impl Agent for GitHubAgent {
    fn agent_id(&self) -> &str {
        "agent_c_github"
    }

    fn name(&self) -> &str {
        "Agent C - GitHub Intelligence"
    }

    async fn run(&self, ctx: &AgentContext) -> AgentResult {
        let start = Instant::now();
        ctx.hub.update_agent_status(self.agent_id(), "active");

        let (result, mode) = if let Some((repo, number)) = Self::pr_hint(ctx) {
            (self.client.get_pull_request(&repo, number).await, "pull_request")
        } else {
            let query = Self::component_query(ctx);
            (self.client.search_repositories(&query, SEARCH_LIMIT).await, "repository_search")
        };

        if !result.success {
            ctx.hub.update_agent_status(self.agent_id(), "failed");
            let mut failed = AgentResult::failed(
                self.agent_id(),
                self.name(),
                result.error_message.unwrap_or_else(|| "GitHub lookup failed".to_string()),
            );
            failed.execution_time = start.elapsed();
            return failed;
        }

        ctx.hub.update_agent_status(self.agent_id(), "completed");

        let confidence = quick_confidence(0.7, mode == "pull_request");

        AgentResult {
            agent_id: self.agent_id().to_string(),
            name: self.name().to_string(),
            status: ExecutionStatus::Success,
            findings: json!({
                "github": {
                    "mode": mode,
                    "data": result.data,
                    "source": result.source,
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

    struct ScriptedGitHub;
    #[at]
    impl McpProtocol for ScriptedGitHub {
        async fn call(&self, _server_id: &str, operation: &str, _args: &Value) -> QeResult<Value> {
            match operation {
                "github_get_pull_request" => Ok(json!({"number": 468, "title": "Digest-based upgrades", "merged": true})),
                "github_search_repositories" => Ok(json!({"items": [{"full_name": "stolostron/cluster-curator-controller"}]})),
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
            Err(QeError::TransientExternal("github unreachable".into()))
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
    async fn fetches_the_linked_pull_request_when_agent_a_found_one() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(ScriptedGitHub), Arc::new(NoFallback)));
        let ctx = context(
            mcp,
            json!({"agent_a_jira_intelligence": {"pr_details": {"pr_number": "468", "repository": "stolostron/cluster-curator-controller"}}}),
        );
        let agent = GitHubAgent::new(GitHubClient::new(ctx.mcp.clone(), "github"));
        let result = agent.run(&ctx).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.findings["github"]["mode"], json!("pull_request"));
        assert_eq!(result.findings["github"]["data"]["number"], json!(468));
    }

    #[tokio::test]
    async fn falls_back_to_repository_search_without_a_pr_hint() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(ScriptedGitHub), Arc::new(NoFallback)));
        let ctx = context(mcp, Value::Null);
        let agent = GitHubAgent::new(GitHubClient::new(ctx.mcp.clone(), "github"));
        let result = agent.run(&ctx).await;

        assert_eq!(result.findings["github"]["mode"], json!("repository_search"));
    }

    #[tokio::test]
    async fn unreachable_github_service_yields_failed_result() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(Unreachable), Arc::new(NoFallback)));
        let ctx = context(mcp, Value::Null);
        let agent = GitHubAgent::new(GitHubClient::new(ctx.mcp.clone(), "github"));
        let result = agent.run(&ctx).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
    }
}
