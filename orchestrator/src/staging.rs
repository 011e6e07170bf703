//! Phase 2.5 — Data-flow Staging + QE Intelligence (spec §4.7).
//!
//! Wraps every Phase 1/Phase 2 [`AgentResult`] as an
//! [`AgentIntelligencePackage`], invokes the QE Intelligence service over
//! the combined findings, and assembles the single [`DataFlowBundle`]
//! handed to Phase 3. Grounded on `original_source`'s
//! `test_parallel_data_flow_mock.py`, which asserts the verbatim-content
//! invariant this module exists to uphold.

use qe_core::{AgentIntelligencePackage, AgentResult, DataFlowBundle, DetailedAnalysis, ExecutionStatus, PhaseResult};
use serde_json::{json, Value};

use crate::agents::qe::run_qe_intelligence;

/// Condenses an agent's full findings tree into a small summary: the
/// top-level keys, each truncated to a short preview. The *detailed*
/// content (below) is never touched by this truncation — only the summary
/// is allowed to be lossy (spec §3 invariant).
fn summarize(findings: &Value) -> Value {
    match findings {
        Value::Object(map) => {
            let mut summary = serde_json::Map::new();
            for (key, value) in map {
                let preview = match value {
                    Value::String(s) => json!(s.chars().take(120).collect::<String>()),
                    Value::Object(_) | Value::Array(_) => json!(format!("{} ({} fields)", key, value.as_object().map(|m| m.len()).unwrap_or_else(|| value.as_array().map_or(0, Vec::len)))),
                    other => other.clone(),
                };
                summary.insert(key.clone(), preview);
            }
            Value::Object(summary)
        }
        other => other.clone(),
    }
}

fn to_package(result: &AgentResult) -> AgentIntelligencePackage {
    let content = if result.findings.is_null() {
        String::new()
    } else {
        serde_json::to_string_pretty(&result.findings).unwrap_or_default()
    };

    AgentIntelligencePackage {
        agent_id: result.agent_id.clone(),
        agent_name: result.name.clone(),
        status: result.status,
        findings_summary: summarize(&result.findings),
        detailed_analysis: DetailedAnalysis {
            output_file: result.output_file.clone(),
            content,
        },
        confidence: result.confidence,
        execution_time: result.execution_time,
    }
}

/// Stages Phase 1 and Phase 2's agent results into the Phase 3 input
/// bundle, running QE Intelligence over the combined findings first.
pub fn stage(phase1: &PhaseResult, phase2: &PhaseResult) -> DataFlowBundle {
    let mut packages: Vec<AgentIntelligencePackage> = Vec::new();
    let mut findings_by_agent: Vec<(String, Value)> = Vec::new();

    for result in phase1.agent_results.iter().chain(phase2.agent_results.iter()) {
        findings_by_agent.push((result.agent_id.clone(), result.findings.clone()));
        packages.push(to_package(result));
    }

    let qe_intelligence = Some(run_qe_intelligence(&findings_by_agent));

    let data_preservation_verified = packages
        .iter()
        .filter(|p| p.status == ExecutionStatus::Success)
        .all(|p| p.has_preserved_content());

    DataFlowBundle {
        packages,
        qe_intelligence,
        data_preservation_verified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_core::{AgentResult, PhaseResult};
    use std::time::Duration;

    fn success(agent_id: &str, findings: Value) -> AgentResult {
        AgentResult {
            agent_id: agent_id.to_string(),
            name: agent_id.to_string(),
            status: ExecutionStatus::Success,
            findings,
            confidence: 0.8,
            execution_time: Duration::from_millis(5),
            output_file: None,
            error_message: None,
        }
    }

    #[test]
    fn detailed_content_is_preserved_verbatim() {
        let findings = json!({"jira_info": {"component": "ClusterCurator", "description": "x".repeat(10_000)}});
        let phase1 = PhaseResult::new("phase_1", "Foundation", vec![success("agent_a_jira_intelligence", findings.clone())], Duration::ZERO);
        let phase2 = PhaseResult::new("phase_2", "Deep Investigation", vec![], Duration::ZERO);

        let bundle = stage(&phase1, &phase2);
        let package = &bundle.packages[0];
        let roundtripped: Value = serde_json::from_str(&package.detailed_analysis.content).unwrap();
        assert_eq!(roundtripped, findings);
    }

    #[test]
    fn data_preservation_verified_false_when_a_success_has_empty_findings() {
        let phase1 = PhaseResult::new("phase_1", "Foundation", vec![success("agent_a_jira_intelligence", Value::Null)], Duration::ZERO);
        let phase2 = PhaseResult::new("phase_2", "Deep Investigation", vec![], Duration::ZERO);
        let bundle = stage(&phase1, &phase2);
        assert!(!bundle.data_preservation_verified);
    }

    #[test]
    fn data_preservation_verified_ignores_failed_agents() {
        let phase1 = PhaseResult::new("phase_1", "Foundation", vec![AgentResult::failed("agent_a_jira_intelligence", "Agent A", "boom")], Duration::ZERO);
        let phase2 = PhaseResult::new("phase_2", "Deep Investigation", vec![], Duration::ZERO);
        let bundle = stage(&phase1, &phase2);
        assert!(bundle.data_preservation_verified);
    }

    #[test]
    fn summary_is_small_even_for_large_findings() {
        let findings = json!({"description": "x".repeat(10_000)});
        let phase1 = PhaseResult::new("phase_1", "Foundation", vec![success("agent_a_jira_intelligence", findings)], Duration::ZERO);
        let phase2 = PhaseResult::new("phase_2", "Deep Investigation", vec![], Duration::ZERO);
        let bundle = stage(&phase1, &phase2);
        let summary_str = bundle.packages[0].findings_summary.to_string();
        assert!(summary_str.len() < 200);
    }

    #[test]
    fn qe_intelligence_is_always_present() {
        let phase1 = PhaseResult::new("phase_1", "Foundation", vec![], Duration::ZERO);
        let phase2 = PhaseResult::new("phase_2", "Deep Investigation", vec![], Duration::ZERO);
        let bundle = stage(&phase1, &phase2);
        assert!(bundle.qe_intelligence.is_some());
    }
}
