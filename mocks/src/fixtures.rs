//! Canned response sets for the "ACM-22079" scenario used throughout the
//! generator's integration tests (spec §8 scenario S6), and for the
//! Jenkins-failure analyzer's decision-matrix scenarios S1-S5. Grounded on
//! the teacher's `mocks/src/fixtures.rs` `create_test_task`-style canned
//! data, adapted to the platform's JSON findings shape.

use qe_mcp_client::McpSettings;
use serde_json::{json, Value};

use crate::protocol::ScriptedProtocol;

/// A fully-wired, happy-path [`ScriptedProtocol`] for the digest-based
/// upgrade ticket used across the generator's integration tests: a JIRA
/// issue naming `ClusterCurator` with a linked PR, a healthy environment,
/// one matching documentation file, and a merged pull request.
pub fn acm_22079_protocol() -> ScriptedProtocol {
    ScriptedProtocol::new()
        .script(
            "jira_get_issue",
            json!({
                "title": "ClusterCurator digest-based upgrades",
                "description": "Implement digest-based upgrade mechanism for disconnected clusters",
                "component": "ClusterCurator",
                "priority": "High",
                "fix_version": "2.15.0",
                "pr_number": "468",
                "repository": "stolostron/cluster-curator-controller",
            }),
        )
        .script("environment_check_health", json!({"healthy": true, "accessible": true, "api_accessible": true}))
        .script("filesystem_search_files", json!({"matches": ["docs/cluster-curator.md"]}))
        .script("filesystem_read_file", json!({"content": "# ClusterCurator\nSupports digest-based upgrades for disconnected environments."}))
        .script("github_get_pull_request", json!({"number": 468, "title": "Add digest-based upgrade support", "merged": true}))
        .script("github_search_repositories", json!({"items": [{"full_name": "stolostron/cluster-curator-controller"}]}))
}

pub fn default_mcp_settings() -> McpSettings {
    McpSettings::default()
}

/// A Jenkins console log fixture naming a known component, usable across
/// the evidence crate's classification scenarios.
pub fn sample_console_log_search_timeout() -> &'static str {
    "14:32:01 Running test: should display search results\n14:32:31 ERROR: connection to search-api timed out after 30s\n14:32:31 FAILED: should display search results"
}

pub fn sample_stack_trace_null_pointer() -> &'static str {
    "at com.example.search.SearchController.handleQuery(SearchController.java:142)\n  at search-api.Router.dispatch(Router.java:58)"
}

/// A minimal Jenkins `testReport` payload shape, one failing test.
pub fn sample_test_report(test_name: &str, error_message: &str) -> Value {
    json!({
        "suites": [{
            "cases": [{
                "name": test_name,
                "status": "FAILED",
                "errorDetails": error_message,
            }]
        }]
    })
}
