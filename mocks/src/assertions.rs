//! Custom assertion helpers with readable failure messages, grounded on
//! the teacher's `mocks/src/assertions.rs` `assert_task_equals`-style
//! helpers.

use qe_core::{ExecutionStatus, PhaseResult, WorkflowResult};

/// Asserts every named agent id succeeded within `phase`.
pub fn assert_agents_succeeded(phase: &PhaseResult, agent_ids: &[&str]) {
    for agent_id in agent_ids {
        let result = phase.agent_results.iter().find(|r| r.agent_id == *agent_id);
        match result {
            Some(r) => assert_eq!(r.status, ExecutionStatus::Success, "agent '{agent_id}' in phase '{}' did not succeed: {:?}", phase.phase_id, r.error_message),
            None => panic!("phase '{}' has no result for agent '{agent_id}'", phase.phase_id),
        }
    }
}

/// Asserts the workflow completed successfully and ran every expected
/// phase id, in order.
pub fn assert_workflow_completed(result: &WorkflowResult, expected_phase_ids: &[&str]) {
    assert!(result.success, "workflow did not succeed: {:?}", result.error_message);
    let actual: Vec<&str> = result.phases.iter().map(|p| p.phase_id.as_str()).collect();
    assert_eq!(actual, expected_phase_ids, "workflow ran a different phase sequence than expected");
}

/// Asserts a findings tree has a string value at the given dotted path.
pub fn assert_findings_contains(findings: &serde_json::Value, path: &[&str], expected: &str) {
    let mut current = findings;
    for segment in path {
        current = current.get(segment).unwrap_or_else(|| panic!("findings tree has no key '{segment}' along path {path:?}: {findings}"));
    }
    assert_eq!(current.as_str(), Some(expected), "expected '{expected}' at path {path:?}, found {current}");
}
