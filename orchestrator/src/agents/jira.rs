//! Agent A — JIRA Intelligence.
//!
//! Pulls the ticket's core fields and, when the ticket links to a pull
//! request, publishes a `pr_discovery` message on the phase hub so Agent D
//! (environment) can target its assessment at the right deployment
//! components. Grounded on `original_source`'s `test_agent_d_mock.py`
//! `test_pause_and_wait_coordination`, which shows Agent D consuming a
//! `pr_discovery` message shaped exactly like this.

use std::time::Instant;

use async_trait::async_trait;
use qe_core::{AgentResult, ExecutionStatus, Priority, Target};
use qe_evidence::quick_confidence;
use qe_mcp_client::JiraClient;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentContext};

pub struct JiraAgent {
    client: JiraClient,
}

impl JiraAgent {
    pub fn new(client: JiraClient) -> Self {
        Self { client }
    }

    /// Extracts a `{pr_number, repository}` hint from a JIRA payload, if the
    /// ticket names one. Real JIRA fields vary by project; this looks for
    /// the two shapes the original's fixtures use.
    fn pr_hint(data: &Value) -> Option<Value> {
        let pr_number = data.get("pr_number").or_else(|| data.get("linked_pr"))?;
        Some(json!({
            "pr_number": pr_number,
            "repository": data.get("repository").cloned().unwrap_or(Value::Null),
        }))
    }
}

#[async_trait]
impl Agent for JiraAgent {
    fn agent_id(&self) -> &str {
        "agent_a_jira_intelligence"
    }

    fn name(&self) -> &str {
        "Agent A - JIRA Intelligence"
    }

    async fn run(&self, ctx: &AgentContext) -> AgentResult {
        let start = Instant::now();
        ctx.hub.update_agent_status(self.agent_id(), "active");

        let result = self.client.get_issue(&ctx.jira_id).await;
        if !result.success {
            ctx.hub.update_agent_status(self.agent_id(), "failed");
            let mut failed = AgentResult::failed(
                self.agent_id(),
                self.name(),
                result.error_message.unwrap_or_else(|| "JIRA lookup failed".to_string()),
            );
            failed.execution_time = start.elapsed();
            return failed;
        }

        let data = result.data;
        let has_title = data.get("title").and_then(Value::as_str).is_some_and(|s| !s.is_empty());
        let has_description = data.get("description").and_then(Value::as_str).is_some_and(|s| !s.is_empty());

        let jira_info = json!({
            "jira_id": ctx.jira_id,
            "title": data.get("title").cloned().unwrap_or(Value::Null),
            "description": data.get("description").cloned().unwrap_or_else(|| json!("")),
            "component": data.get("component").cloned().unwrap_or_else(|| json!("Unknown")),
            "priority": data.get("priority").cloned().unwrap_or_else(|| json!("Unknown")),
            "fix_version": data.get("fix_version").cloned(),
        });

        let pr_hint = Self::pr_hint(&data);
        if let Some(ref hint) = pr_hint {
            ctx.hub.publish(
                self.agent_id(),
                Target::Broadcast,
                "pr_discovery",
                json!({
                    "pr_info": hint,
                    "requires_environment_collection": true,
                }),
                Priority::High,
                false,
            );
        }

        ctx.hub.update_agent_status(self.agent_id(), "completed");

        let confidence = quick_confidence(0.8, has_title && has_description);

        AgentResult {
            agent_id: self.agent_id().to_string(),
            name: self.name().to_string(),
            status: ExecutionStatus::Success,
            findings: json!({
                "jira_info": jira_info,
                "pr_details": pr_hint,
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
    use qe_core::{QeError, Result as QeResult, ServerConfig, ServerStatus, TransportKind};
    use qe_hub::CommunicationHub;
    use qe_mcp_client::{FallbackProvider, McpClient, McpProtocol, McpSettings};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct ScriptedJira(Value);

    #[at]
    impl McpProtocol for ScriptedJira {
        async fn call(&self, _server_id: &str, _operation: &str, _args: &Value) -> QeResult<Value> {
            Ok(self.0.clone())
        }
        async fn health_check(&self, _server_id: &str) -> ServerStatus {
            ServerStatus::Available
        }
    }

    struct NeverCalled;

    #[at]
    impl McpProtocol for NeverCalled {
        async fn call(&self, _server_id: &str, _operation: &str, _args: &Value) -> QeResult<Value> {
            Err(QeError::TransientExternal("jira unreachable".into()))
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

    fn servers() -> HashMap<String, ServerConfig> {
        let mut m = HashMap::new();
        m.insert(
            "jira".to_string(),
            ServerConfig {
                server_id: "jira".to_string(),
                transport: TransportKind::Stdio,
                command: None,
                args: vec![],
                url: None,
                credential_ref: None,
            },
        );
        m
    }

    fn context(mcp: Arc<McpClient>) -> AgentContext {
        let hub = CommunicationHub::new("phase_1", "run_test");
        AgentContext {
            run_id: "run_test".into(),
            jira_id: "ACM-22079".into(),
            mcp,
            hub,
            upstream: Value::Null,
        }
    }

    #[tokio::test]
    async fn successful_lookup_publishes_pr_discovery_and_reports_confidence() {
        let mcp = Arc::new(McpClient::new(
            servers(),
            McpSettings::default(),
            Arc::new(ScriptedJira(json!({
                "title": "ClusterCurator digest-based upgrades",
                "description": "Implement digest-based upgrade mechanism",
                "component": "ClusterCurator",
                "priority": "High",
                "fix_version": "2.15.0",
                "pr_number": "468",
                "repository": "stolostron/cluster-curator-controller",
            }))),
            Arc::new(NoFallback),
        ));
        let ctx = context(mcp);
        ctx.hub.start();
        let mut rx = ctx.hub.subscribe("agent_d_environment_intelligence", &["pr_discovery"]);

        let agent = JiraAgent::new(JiraClient::new(ctx.mcp.clone(), "jira"));
        let result = agent.run(&ctx).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert!(result.confidence > 0.0);
        assert_eq!(result.findings["jira_info"]["component"], json!("ClusterCurator"));

        let message = rx.recv().await.expect("Agent D should see the pr_discovery broadcast");
        assert_eq!(message.payload["requires_environment_collection"], json!(true));
        ctx.hub.stop();
    }

    #[tokio::test]
    async fn unreachable_jira_yields_failed_result_with_zero_confidence() {
        let mcp = Arc::new(McpClient::new(servers(), McpSettings::default(), Arc::new(NeverCalled), Arc::new(NoFallback)));
        let ctx = context(mcp);
        let agent = JiraAgent::new(JiraClient::new(ctx.mcp.clone(), "jira"));
        let result = agent.run(&ctx).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.confidence, 0.0);
    }
}
