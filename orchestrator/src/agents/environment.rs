//! Agent D — Environment Intelligence.
//!
//! Runs in parallel with Agent A in Phase 1. Grounded on `original_source`'s
//! `test_agent_d_mock.py::test_pause_and_wait_coordination`: Agent D briefly
//! waits on the phase hub for Agent A's `pr_discovery` broadcast before
//! checking environment health, so that when a PR names a target cluster
//! the health check can be scoped to it — but it never blocks the phase
//! indefinitely on a message that may not come (spec §4.2 delivery is
//! best-effort; §5 "no ordering between agents").

use std::time::{Duration, Instant};

use async_trait::async_trait;
use qe_core::AgentResult;
use qe_evidence::quick_confidence;
use qe_mcp_client::EnvironmentClient;
use serde_json::{json, Value};

use crate::agent::{Agent, AgentContext};

/// How long Agent D waits for a `pr_discovery` broadcast before giving up
/// and checking a default cluster. Short enough not to stall the phase
/// when Agent A has nothing to report.
const PAUSE_AND_WAIT_TIMEOUT: Duration = Duration::from_millis(300);

const DEFAULT_CLUSTER: &str = "default-cluster";

pub struct EnvironmentAgent {
    client: EnvironmentClient,
}

impl EnvironmentAgent {
    pub fn new(client: EnvironmentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Agent for EnvironmentAgent {
    fn agent_id(&self) -> &str {
        "agent_d_environment_intelligence"
    }

    fn name(&self) -> &str {
        "Agent D - Environment Intelligence"
    }

    async fn run(&self, ctx: &AgentContext) -> AgentResult {
        let start = Instant::now();
        ctx.hub.update_agent_status(self.agent_id(), "active");

        let mut rx = ctx.hub.subscribe(self.agent_id(), &["pr_discovery"]);
        let pr_context = match tokio::time::timeout(PAUSE_AND_WAIT_TIMEOUT, rx.recv()).await {
            Ok(Some(message)) => Some(message.payload),
            _ => None,
        };

        let cluster = pr_context
            .as_ref()
            .and_then(|p| p.get("pr_info"))
            .and_then(|p| p.get("repository"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CLUSTER);

        let result = self.client.check_health(cluster).await;
        if !result.success {
            ctx.hub.update_agent_status(self.agent_id(), "failed");
            let mut failed = AgentResult::failed(
                self.agent_id(),
                self.name(),
                result.error_message.unwrap_or_else(|| "environment health check failed".to_string()),
            );
            failed.execution_time = start.elapsed();
            return failed;
        }

        let data = result.data;
        let healthy = data.get("healthy").and_then(Value::as_bool).unwrap_or(false);
        let accessible = data.get("accessible").and_then(Value::as_bool).unwrap_or(healthy);
        let api_accessible = data.get("api_accessible").and_then(Value::as_bool).unwrap_or(healthy);

        ctx.hub.update_agent_status(self.agent_id(), "completed");

        let confidence = quick_confidence(0.75, pr_context.is_some());

        AgentResult {
            agent_id: self.agent_id().to_string(),
            name: self.name().to_string(),
            status: qe_core::ExecutionStatus::Success,
            findings: json!({
                "environment": {
                    "healthy": healthy,
                    "accessible": accessible,
                    "api_accessible": api_accessible,
                    "target_cluster": cluster,
                },
                "received_pr_context": pr_context.is_some(),
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
    use qe_core::{ExecutionStatus, Priority, QeError, Result as QeResult, ServerStatus, Target};
    use qe_hub::CommunicationHub;
    use qe_mcp_client::{FallbackProvider, McpClient, McpProtocol, McpSettings};
    use std::sync::Arc;

    struct ScriptedEnv(Value);

    #[at]
    impl McpProtocol for ScriptedEnv {
        async fn call(&self, _server_id: &str, _operation: &str, _args: &Value) -> QeResult<Value> {
            Ok(self.0.clone())
        }
        async fn health_check(&self, _server_id: &str) -> ServerStatus {
            ServerStatus::Available
        }
    }

    struct Unreachable;
    #[at]
    impl McpProtocol for Unreachable {
        async fn call(&self, _server_id: &str, _operation: &str, _args: &Value) -> QeResult<Value> {
            Err(QeError::TransientExternal("unreachable".into()))
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

    fn context(mcp: Arc<McpClient>) -> AgentContext {
        let hub = CommunicationHub::new("phase_1", "run_test");
        AgentContext {
            run_id: "run_test".into(),
            jira_id: "ACM-1".into(),
            mcp,
            hub,
            upstream: Value::Null,
        }
    }

    #[tokio::test]
    async fn proceeds_with_default_cluster_when_no_pr_discovery_arrives() {
        let mcp = Arc::new(McpClient::new(
            Default::default(),
            McpSettings::default(),
            Arc::new(ScriptedEnv(json!({"healthy": true, "accessible": true, "api_accessible": true}))),
            Arc::new(NoFallback),
        ));
        let ctx = context(mcp);
        ctx.hub.start();

        let agent = EnvironmentAgent::new(EnvironmentClient::new(ctx.mcp.clone(), "environment"));
        let result = agent.run(&ctx).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.findings["environment"]["target_cluster"], json!(DEFAULT_CLUSTER));
        assert_eq!(result.findings["received_pr_context"], json!(false));
        ctx.hub.stop();
    }

    #[tokio::test]
    async fn picks_up_cluster_hint_from_pr_discovery_broadcast() {
        let mcp = Arc::new(McpClient::new(
            Default::default(),
            McpSettings::default(),
            Arc::new(ScriptedEnv(json!({"healthy": true, "accessible": true, "api_accessible": true}))),
            Arc::new(NoFallback),
        ));
        let ctx = context(mcp);
        ctx.hub.start();

        ctx.hub.publish(
            "agent_a_jira_intelligence",
            Target::Broadcast,
            "pr_discovery",
            json!({"pr_info": {"repository": "stolostron/cluster-curator-controller"}}),
            Priority::High,
            false,
        );

        let agent = EnvironmentAgent::new(EnvironmentClient::new(ctx.mcp.clone(), "environment"));
        let result = agent.run(&ctx).await;

        assert_eq!(result.findings["environment"]["target_cluster"], json!("stolostron/cluster-curator-controller"));
        assert_eq!(result.findings["received_pr_context"], json!(true));
        ctx.hub.stop();
    }

    #[tokio::test]
    async fn unreachable_environment_service_yields_failed_result() {
        let mcp = Arc::new(McpClient::new(Default::default(), McpSettings::default(), Arc::new(Unreachable), Arc::new(NoFallback)));
        let ctx = context(mcp);
        let agent = EnvironmentAgent::new(EnvironmentClient::new(ctx.mcp.clone(), "environment"));
        let result = agent.run(&ctx).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
    }
}
