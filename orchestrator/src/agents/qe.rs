//! QE Intelligence service, invoked by Phase 2.5 staging alongside the
//! agent-package wrapping step (spec §4.1 Phase 2.5, §3 `QEIntelligencePackage`).
//!
//! Unlike A–D this isn't an [`crate::agent::Agent`] competing for a hub
//! subscription — it runs once, synchronously, over the set of packages
//! Phase 1/2 already produced, deriving test patterns, coverage gaps, and
//! automation insights from what the agents found rather than making any
//! external call of its own.

use qe_core::{ExecutionStatus, QeIntelligencePackage};
use qe_evidence::ComponentExtractor;
use serde_json::Value;

const SERVICE_NAME: &str = "qe_intelligence";

/// Walks the staged findings tree looking for a string at any of `keys`
/// (dotted-path shorthand via nested `get` calls), returning the first hit.
fn find_str<'a>(findings: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = findings;
    for segment in path {
        current = current.get(segment)?;
    }
    current.as_str()
}

/// Derives a QE Intelligence package from the agent findings staged so far.
/// Deterministic: the same findings always produce the same package.
pub fn run_qe_intelligence(findings_by_agent: &[(String, Value)]) -> QeIntelligencePackage {
    let extractor = ComponentExtractor::new();
    let mut test_patterns = Vec::new();
    let mut coverage_gaps = Vec::new();
    let mut automation_insights = Vec::new();

    let mut recognized_components: Vec<String> = Vec::new();

    for (agent_id, findings) in findings_by_agent {
        match agent_id.as_str() {
            "agent_a_jira_intelligence" => {
                if let Some(component) = find_str(findings, &["jira_info", "component"]) {
                    if component != "Unknown" {
                        test_patterns.push(format!("component-scoped regression suite for {component}"));
                    }
                }
                if findings.get("pr_details").map(Value::is_null).unwrap_or(true) {
                    coverage_gaps.push("no linked pull request found; automation coverage cannot be cross-checked against code changes".to_string());
                }
            }
            "agent_b_documentation" => {
                let matched = findings
                    .get("documentation")
                    .and_then(|d| d.get("matched_files"))
                    .and_then(Value::as_array)
                    .map(|a| !a.is_empty())
                    .unwrap_or(false);
                if !matched {
                    coverage_gaps.push("no documentation matched this component; test-step prose will rely on JIRA description alone".to_string());
                } else if let Some(excerpt) = findings.get("documentation").and_then(|d| d.get("excerpt")).and_then(Value::as_str) {
                    for component in extractor.extract_from_error(excerpt) {
                        recognized_components.push(component.name);
                    }
                }
            }
            "agent_c_github" => {
                if findings.get("github").and_then(|g| g.get("mode")).and_then(Value::as_str) == Some("pull_request") {
                    automation_insights.push("a merged pull request backs this ticket; prioritize UI+CLI parity checks over new exploratory coverage".to_string());
                } else {
                    automation_insights.push("no linked pull request; treat generated cases as exploratory until a PR is linked".to_string());
                }
            }
            "agent_d_environment_intelligence" => {
                let healthy = findings.get("environment").and_then(|e| e.get("healthy")).and_then(Value::as_bool).unwrap_or(false);
                if !healthy {
                    coverage_gaps.push("target environment reported unhealthy; infrastructure-flavored test cases should be deprioritized".to_string());
                }
            }
            _ => {}
        }
    }

    recognized_components.sort();
    recognized_components.dedup();
    for component in recognized_components {
        test_patterns.push(format!("targeted coverage for recognized subsystem component {component}"));
    }

    if test_patterns.is_empty() {
        test_patterns.push("generic end-to-end smoke coverage".to_string());
    }

    QeIntelligencePackage {
        service_name: SERVICE_NAME.to_string(),
        status: ExecutionStatus::Success,
        test_patterns,
        coverage_gaps,
        automation_insights,
        confidence: qe_evidence::quick_confidence(0.65, !recognized_components_empty(findings_by_agent)),
    }
}

fn recognized_components_empty(findings_by_agent: &[(String, Value)]) -> bool {
    findings_by_agent.iter().any(|(id, f)| id == "agent_a_jira_intelligence" && find_str(f, &["jira_info", "component"]).is_some())
}
