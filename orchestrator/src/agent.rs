//! The `Agent` trait and the per-run context handed to every agent.
//!
//! Agents never throw across the phase boundary (spec §7): every failure
//! is captured into a `Failed` `AgentResult` here rather than propagated
//! as a Rust error, matching the Python original's try/except-per-agent
//! shape without the exception-for-control-flow idiom.

use std::sync::Arc;

use async_trait::async_trait;
use qe_core::AgentResult;
use qe_hub::CommunicationHub;
use qe_mcp_client::McpClient;

/// Everything an agent needs that isn't specific to its own investigation:
/// which run/ticket it's working on, the shared MCP facade, and the
/// communication hub for the phase it's running in. Built fresh per phase
/// by the orchestrator — no agent holds a reference across phase
/// boundaries (DESIGN NOTES §9, "global singletons" replaced by explicit
/// ownership).
pub struct AgentContext {
    pub run_id: String,
    pub jira_id: String,
    pub mcp: Arc<McpClient>,
    pub hub: Arc<CommunicationHub>,
    /// Aggregated findings from every prior phase, keyed by agent id.
    /// Phase 2 agents read this instead of sharing a hub with Phase 1 —
    /// the hub is scoped to a single phase (spec §4.2), so cross-phase
    /// handoff goes through this explicit, orchestrator-assembled tree
    /// rather than a surviving subscription.
    pub upstream: serde_json::Value,
}

impl AgentContext {
    /// Convenience accessor for a prior agent's findings by id, or `Null`
    /// if that agent never ran or produced nothing.
    pub fn upstream_findings(&self, agent_id: &str) -> &serde_json::Value {
        self.upstream.get(agent_id).unwrap_or(&serde_json::Value::Null)
    }
}

/// A named unit of investigation producing one `AgentResult` per run
/// (GLOSSARY: "Agent").
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_id(&self) -> &str;
    fn name(&self) -> &str;

    /// Run the investigation. Must never panic and must never return a Rust
    /// `Err` that crosses the phase boundary — any failure is folded into
    /// the returned `AgentResult` with `status = Failed`.
    async fn run(&self, ctx: &AgentContext) -> AgentResult;
}
