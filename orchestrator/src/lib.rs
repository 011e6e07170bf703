//! `qe-orchestrator` — the phased pipeline that turns a JIRA ticket into
//! `Test-Cases.md` / `Complete-Analysis.md` (spec §4.1).
//!
//! Seven phases run in a fixed order: Phase 0 (cleanup) → Phase 1 (Agents
//! A+D, parallel) → Phase 2 (Agents B+C, parallel) → Phase 2.5 (staging + QE
//! Intelligence) → Phase 3 (analysis synthesis) → Phase 4 (artifact writing)
//! → Phase 5 (cleanup). Every phase, including the agent-less cleanup and
//! staging steps, contributes a [`PhaseResult`] to [`WorkflowResult::phases`]
//! so a caller can observe that all seven ran. Phases 1 and 2 each get their
//! own [`qe_hub::CommunicationHub`] — the hub is scoped to a phase, not a run
//! (spec §4.2) — and [`AgentContext::upstream`] is how findings cross the
//! phase boundary in between.

pub mod agent;
pub mod agents;
pub mod analysis;
pub mod circuit;
pub mod cleanup;
pub mod reporting;
pub mod staging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use qe_core::{AgentResult, ExecutionStatus, PhaseResult, QeError, RunOutcome, WorkflowResult};
use qe_hub::CommunicationHub;
use qe_mcp_client::{EnvironmentClient, FilesystemClient, GitHubClient, JiraClient, McpClient};
use tracing::{error, info, instrument, warn};

use crate::agent::{Agent, AgentContext};
use crate::agents::{DocumentationAgent, EnvironmentAgent, GitHubAgent, JiraAgent};

/// Runs the full pipeline for one JIRA ticket against one MCP facade.
/// Owns no state beyond the run's scratch-directory root — everything
/// per-run (hub, agent contexts) is built fresh inside
/// [`Orchestrator::execute_full_workflow`], matching DESIGN NOTES §9's
/// "explicit ownership over global singletons" decision.
pub struct Orchestrator {
    root: PathBuf,
    mcp: Arc<McpClient>,
}

impl Orchestrator {
    pub fn new(root: impl Into<PathBuf>, mcp: Arc<McpClient>) -> Self {
        Self { root: root.into(), mcp }
    }

    fn run_directory(&self, jira_id: &str, run_id: &str) -> PathBuf {
        self.root.join("runs").join(jira_id).join(run_id)
    }

    async fn run_phase1(&self, run_id: &str, jira_id: &str) -> (PhaseResult, serde_json::Value) {
        let start = Instant::now();
        let hub = CommunicationHub::new("phase_1", run_id);
        hub.start();

        let jira_ctx = AgentContext {
            run_id: run_id.to_string(),
            jira_id: jira_id.to_string(),
            mcp: self.mcp.clone(),
            hub: hub.clone(),
            upstream: serde_json::Value::Null,
        };
        let env_ctx = AgentContext {
            run_id: run_id.to_string(),
            jira_id: jira_id.to_string(),
            mcp: self.mcp.clone(),
            hub: hub.clone(),
            upstream: serde_json::Value::Null,
        };

        let jira_agent = JiraAgent::new(JiraClient::new(self.mcp.clone(), "jira"));
        let env_agent = EnvironmentAgent::new(EnvironmentClient::new(self.mcp.clone(), "environment"));

        let (jira_result, env_result) = tokio::join!(async move { jira_agent.run(&jira_ctx).await }, async move { env_agent.run(&env_ctx).await });

        hub.stop();

        let upstream = serde_json::json!({
            (jira_result.agent_id.clone()): jira_result.findings.clone(),
            (env_result.agent_id.clone()): env_result.findings.clone(),
        });

        let phase = PhaseResult::new("phase_1", "Foundation", vec![jira_result, env_result], start.elapsed());
        (phase, upstream)
    }

    async fn run_phase2(&self, run_id: &str, jira_id: &str, upstream: serde_json::Value) -> PhaseResult {
        let start = Instant::now();
        let hub = CommunicationHub::new("phase_2", run_id);
        hub.start();

        let doc_ctx = AgentContext {
            run_id: run_id.to_string(),
            jira_id: jira_id.to_string(),
            mcp: self.mcp.clone(),
            hub: hub.clone(),
            upstream: upstream.clone(),
        };
        let gh_ctx = AgentContext {
            run_id: run_id.to_string(),
            jira_id: jira_id.to_string(),
            mcp: self.mcp.clone(),
            hub: hub.clone(),
            upstream,
        };

        let doc_agent = DocumentationAgent::new(FilesystemClient::new(self.mcp.clone(), "filesystem"));
        let gh_agent = GitHubAgent::new(GitHubClient::new(self.mcp.clone(), "github"));

        let (doc_result, gh_result) = tokio::join!(async move { doc_agent.run(&doc_ctx).await }, async move { gh_agent.run(&gh_ctx).await });

        hub.stop();

        PhaseResult::new("phase_2", "Deep Investigation", vec![doc_result, gh_result], start.elapsed())
    }

    /// Runs every phase for `jira_id` and returns the aggregated
    /// [`WorkflowResult`]. Never panics: a fatal [`QeError`] (Integrity,
    /// UserInput, Cancelled) downgrades the outcome to `FatalAbort` with
    /// `success = false` rather than unwinding.
    #[instrument(skip(self), fields(jira_id))]
    pub async fn execute_full_workflow(&self, jira_id: &str) -> WorkflowResult {
        let run_id = format!("{}_{}", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"), uuid::Uuid::new_v4().simple());
        let run_dir = self.run_directory(jira_id, &run_id);

        let mut phases = Vec::new();

        let phase0_start = Instant::now();
        let phase0_report = cleanup::phase0_cleanup(&self.root);
        phases.push(PhaseResult::new(
            "phase_0",
            "Initialization Cleanup",
            vec![AgentResult {
                agent_id: "phase_0_cleanup".to_string(),
                name: "Initialization Cleanup".to_string(),
                status: ExecutionStatus::Success,
                findings: serde_json::to_value(&phase0_report).unwrap_or(serde_json::Value::Null),
                confidence: 1.0,
                execution_time: phase0_start.elapsed(),
                output_file: None,
                error_message: None,
            }],
            phase0_start.elapsed(),
        ));

        if let Err(e) = std::fs::create_dir_all(&run_dir) {
            let err = QeError::Integrity(format!("failed to create run directory {}: {e}", run_dir.display()));
            error!(error = %err, "fatal: could not create run directory");
            return WorkflowResult {
                success: false,
                outcome: RunOutcome::FatalAbort,
                phases,
                run_directory: run_dir.display().to_string(),
                error_message: Some(err.to_string()),
            };
        }

        let (phase1, phase1_upstream) = self.run_phase1(&run_id, jira_id).await;
        phases.push(phase1.clone());

        let phase2 = self.run_phase2(&run_id, jira_id, phase1_upstream).await;
        phases.push(phase2.clone());

        let staging_start = Instant::now();
        let bundle = staging::stage(&phase1, &phase2);
        let staging_status = if bundle.data_preservation_verified { ExecutionStatus::Success } else { ExecutionStatus::Failed };
        phases.push(PhaseResult::new(
            "phase_2_5",
            "Data-flow Staging",
            vec![AgentResult {
                agent_id: "phase_2_5_staging".to_string(),
                name: "Data-flow Staging".to_string(),
                status: staging_status,
                findings: serde_json::json!({
                    "packages_staged": bundle.packages.len(),
                    "qe_intelligence_present": bundle.qe_intelligence.is_some(),
                    "data_preservation_verified": bundle.data_preservation_verified,
                }),
                confidence: if bundle.data_preservation_verified { 1.0 } else { 0.0 },
                execution_time: staging_start.elapsed(),
                output_file: None,
                error_message: None,
            }],
            staging_start.elapsed(),
        ));

        if !bundle.data_preservation_verified {
            let err = QeError::Integrity("Phase 2.5 data preservation verification failed: a successful agent produced empty detailed content".to_string());
            warn!(error = %err, "fatal: aborting run");
            return WorkflowResult {
                success: false,
                outcome: RunOutcome::FatalAbort,
                phases,
                run_directory: run_dir.display().to_string(),
                error_message: Some(err.to_string()),
            };
        }

        let synthesis = analysis::synthesize(jira_id, &bundle);
        phases.push(PhaseResult::new("phase_3", "AI Analysis", vec![], std::time::Duration::ZERO));

        if let Err(e) = reporting::write_artifacts(&run_dir, &synthesis) {
            error!(error = %e, "fatal: could not write Phase 4 artifacts");
            return WorkflowResult {
                success: false,
                outcome: RunOutcome::FatalAbort,
                phases,
                run_directory: run_dir.display().to_string(),
                error_message: Some(e.to_string()),
            };
        }
        phases.push(PhaseResult::new("phase_4", "Pattern Extension", vec![], std::time::Duration::ZERO));

        let cleanup_report = cleanup::phase5_cleanup(&run_dir);
        phases.push(PhaseResult::new("phase_5", "Comprehensive Cleanup", vec![], std::time::Duration::ZERO));

        info!(
            run_id = %run_id,
            validation_passed = cleanup_report.validation_passed,
            "workflow complete"
        );

        WorkflowResult {
            success: true,
            outcome: RunOutcome::Done,
            phases,
            run_directory: run_dir.display().to_string(),
            error_message: None,
        }
    }
}
