//! Phase 4 — Pattern Extension (spec §4.1, §6 "Test-Cases.md format").
//!
//! Turns a Phase 3 [`AnalysisSynthesis`] into the two mandatory generator
//! artifacts: `Test-Cases.md` and `Complete-Analysis.md`. This module owns
//! the *structural* rules the spec makes normative — column set, id
//! zero-padding, pipe escaping, placeholder scrubbing — not the natural-
//! language content of any individual step (spec Non-goals).

use std::fs;
use std::path::Path;

use once_cell_placeholder::LazyRegexes;
use qe_core::QeError;

use crate::analysis::AnalysisSynthesis;

/// One row of a test case's step table.
#[derive(Debug, Clone)]
pub struct TestStep {
    pub action: String,
    pub ui_method: String,
    pub cli_method: String,
    pub expected_result: String,
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub title: String,
    pub steps: Vec<TestStep>,
}

/// Escapes a literal `|` as `&#124;` so the cell never breaks Markdown
/// table parsing (spec §6, normative).
fn escape_pipe(cell: &str) -> String {
    cell.replace('|', "&#124;")
}

mod once_cell_placeholder {
    //! Minimal lazy-regex holder. The teacher's stack doesn't pull in
    //! `once_cell` for this crate, and a handful of fixed patterns don't
    //! warrant the dependency — each is compiled once per
    //! `scrub_cluster_specifics` call instead, which this module only
    //! calls a handful of times per run (bounded by test-case count).
    use regex::Regex;

    pub struct LazyRegexes;

    impl LazyRegexes {
        pub fn console_url() -> Regex {
            Regex::new(r"https?://console[-.][A-Za-z0-9.\-]+").unwrap()
        }
        pub fn api_url() -> Regex {
            Regex::new(r"https?://api[-.][A-Za-z0-9.\-]+(:\d+)?").unwrap()
        }
        pub fn registry_url() -> Regex {
            Regex::new(r"https?://(image-registry|registry)[-.][A-Za-z0-9.\-]+").unwrap()
        }
        pub fn cluster_host() -> Regex {
            Regex::new(r"\b[a-z0-9-]+\.(apps|devcluster)\.[a-z0-9.-]+\.com\b").unwrap()
        }
        pub fn admin_user() -> Regex {
            Regex::new(r"\bkubeadmin\b").unwrap()
        }
        pub fn password_assignment() -> Regex {
            Regex::new(r"(?i)(password\s*[:=]\s*)\S+").unwrap()
        }
    }
}

/// Replaces credentials and cluster-specific URLs with the fixed
/// placeholder set named in spec §6. Order matters: registry/API/console
/// URLs are more specific than the bare cluster-host pattern, so they run
/// first.
pub fn scrub_cluster_specifics(text: &str) -> String {
    let mut out = LazyRegexes::registry_url().replace_all(text, "<INTERNAL_REGISTRY_URL>").into_owned();
    out = LazyRegexes::console_url().replace_all(&out, "<CLUSTER_CONSOLE_URL>").into_owned();
    out = LazyRegexes::api_url().replace_all(&out, "<CLUSTER_API_URL>").into_owned();
    out = LazyRegexes::cluster_host().replace_all(&out, "<CLUSTER_HOST>").into_owned();
    out = LazyRegexes::admin_user().replace_all(&out, "<CLUSTER_ADMIN_USER>").into_owned();
    out = LazyRegexes::password_assignment().replace_all(&out, "${1}<CLUSTER_ADMIN_PASSWORD>").into_owned();
    out
}

fn render_test_case(index: usize, case: &TestCase) -> String {
    let mut out = format!("## TC-{:03}: {}\n\n", index + 1, case.title);
    out.push_str("| Step | Action | UI Method | CLI Method | Expected Result |\n");
    out.push_str("|------|--------|-----------|------------|------------------|\n");
    for (step_index, step) in case.steps.iter().enumerate() {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            step_index + 1,
            escape_pipe(&scrub_cluster_specifics(&step.action)),
            escape_pipe(&scrub_cluster_specifics(&step.ui_method)),
            escape_pipe(&scrub_cluster_specifics(&step.cli_method)),
            escape_pipe(&scrub_cluster_specifics(&step.expected_result)),
        ));
    }
    out.push('\n');
    out
}

/// Derives a small set of test cases from the synthesized analysis.
/// Degrades gracefully with partial upstream data (spec §4.1: "Phase 4
/// MUST run even if upstream yielded partial data") — with zero
/// recognized components or patterns it still emits one baseline case.
pub fn derive_test_cases(synthesis: &AnalysisSynthesis) -> Vec<TestCase> {
    let mut cases = vec![TestCase {
        title: format!("Verify {} core functionality", synthesis.jira_id),
        steps: vec![
            TestStep {
                action: "Navigate to the affected component".to_string(),
                ui_method: "Open the console and select the relevant resource".to_string(),
                cli_method: "oc get <resource>".to_string(),
                expected_result: "Resource is visible and in a ready state".to_string(),
            },
            TestStep {
                action: "Exercise the changed behavior described in the ticket".to_string(),
                ui_method: "Perform the documented user action through the console".to_string(),
                cli_method: "oc apply -f <manifest>".to_string(),
                expected_result: "The behavior described in the ticket is observed".to_string(),
            },
        ],
    }];

    for pattern in &synthesis.test_patterns {
        if pattern == "generic end-to-end smoke coverage" {
            continue;
        }
        cases.push(TestCase {
            title: format!("Validate {pattern}"),
            steps: vec![TestStep {
                action: format!("Set up the scenario implied by: {pattern}"),
                ui_method: "Use the console workflow for this subsystem".to_string(),
                cli_method: "oc get all -n <namespace>".to_string(),
                expected_result: "Coverage matches the derived pattern with no unexpected errors".to_string(),
            }],
        });
    }

    for component in &synthesis.recognized_components {
        cases.push(TestCase {
            title: format!("Confirm {} is unaffected by regression", component.name),
            steps: vec![TestStep {
                action: format!("Check logs and status for {}", component.name),
                ui_method: "Inspect the pod/deployment status in the console".to_string(),
                cli_method: format!("oc logs deployment/{}", component.name),
                expected_result: "No new errors attributable to this change".to_string(),
            }],
        });
    }

    cases
}

pub fn render_test_cases_md(jira_id: &str, cases: &[TestCase]) -> String {
    let mut out = format!("# Test Cases for {jira_id}\n\n");
    for (index, case) in cases.iter().enumerate() {
        out.push_str(&render_test_case(index, case));
    }
    out
}

pub fn render_complete_analysis_md(synthesis: &AnalysisSynthesis) -> String {
    let mut out = format!("# Complete Analysis for {}\n\n", synthesis.jira_id);

    out.push_str("## Agent Summary\n\n");
    out.push_str(&format!(
        "{} of {} agents completed successfully. Overall confidence: {:.2}.\n\n",
        synthesis.successful_agents, synthesis.total_agents, synthesis.overall_confidence
    ));
    for finding in &synthesis.findings {
        out.push_str(&format!("- **{}**: {}\n", finding.source_agent, finding.summary));
    }
    out.push('\n');

    out.push_str("## Recognized Components\n\n");
    if synthesis.recognized_components.is_empty() {
        out.push_str("No known subsystem components were recognized in the gathered evidence.\n\n");
    } else {
        for component in &synthesis.recognized_components {
            out.push_str(&format!("- {} (via {})\n", component.name, component.source.as_str()));
        }
        out.push('\n');
    }

    out.push_str("## Coverage Gaps\n\n");
    if synthesis.coverage_gaps.is_empty() {
        out.push_str("None identified.\n\n");
    } else {
        for gap in &synthesis.coverage_gaps {
            out.push_str(&format!("- {}\n", scrub_cluster_specifics(gap)));
        }
        out.push('\n');
    }

    out.push_str("## Automation Insights\n\n");
    if synthesis.automation_insights.is_empty() {
        out.push_str("None identified.\n\n");
    } else {
        for insight in &synthesis.automation_insights {
            out.push_str(&format!("- {}\n", scrub_cluster_specifics(insight)));
        }
        out.push('\n');
    }

    out
}

/// Writes both mandatory artifacts into `run_dir`. Returns
/// `QeError::Integrity` only if the directory itself can't be written to
/// — content generation never fails (it degrades to a baseline case with
/// no upstream data, per Phase 4's graceful-degradation contract).
pub fn write_artifacts(run_dir: &Path, synthesis: &AnalysisSynthesis) -> Result<(), QeError> {
    let cases = derive_test_cases(synthesis);
    let test_cases_md = render_test_cases_md(&synthesis.jira_id, &cases);
    let complete_analysis_md = render_complete_analysis_md(synthesis);

    fs::write(run_dir.join("Test-Cases.md"), test_cases_md).map_err(|e| QeError::Integrity(format!("failed to write Test-Cases.md: {e}")))?;
    fs::write(run_dir.join("Complete-Analysis.md"), complete_analysis_md).map_err(|e| QeError::Integrity(format!("failed to write Complete-Analysis.md: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesis() -> AnalysisSynthesis {
        AnalysisSynthesis {
            jira_id: "ACM-22079".to_string(),
            findings: vec![],
            recognized_components: vec![],
            coverage_gaps: vec![],
            automation_insights: vec![],
            test_patterns: vec!["generic end-to-end smoke coverage".to_string()],
            overall_confidence: 0.7,
            successful_agents: 2,
            total_agents: 2,
        }
    }

    #[test]
    fn test_cases_md_has_the_required_header_and_table_columns() {
        let cases = derive_test_cases(&synthesis());
        let md = render_test_cases_md("ACM-22079", &cases);
        assert!(md.starts_with("# Test Cases for ACM-22079\n"));
        assert!(md.contains("## TC-001:"));
        assert!(md.contains("| Step | Action | UI Method | CLI Method | Expected Result |"));
    }

    #[test]
    fn test_case_ids_are_zero_padded() {
        let mut synthesis = synthesis();
        synthesis.test_patterns = (0..12).map(|i| format!("pattern {i}")).collect();
        let cases = derive_test_cases(&synthesis);
        let md = render_test_cases_md("ACM-1", &cases);
        assert!(md.contains("## TC-001:"));
        assert!(md.contains("## TC-010:"));
    }

    #[test]
    fn literal_pipes_in_cell_content_are_escaped() {
        let step = TestStep {
            action: "Run `oc get pods | grep Running`".to_string(),
            ui_method: "n/a".to_string(),
            cli_method: "n/a".to_string(),
            expected_result: "ok".to_string(),
        };
        let case = TestCase {
            title: "Pipe handling".to_string(),
            steps: vec![step],
        };
        let md = render_test_cases_md("ACM-1", &[case]);
        assert!(md.contains("&#124;"));
        assert!(!md.contains("pods | grep"));
    }

    #[test]
    fn scrub_replaces_console_and_api_urls_with_placeholders() {
        let text = "Login at https://console-openshift-console.apps.cluster1.example.com as kubeadmin";
        let scrubbed = scrub_cluster_specifics(text);
        assert!(scrubbed.contains("<CLUSTER_CONSOLE_URL>"));
        assert!(scrubbed.contains("<CLUSTER_ADMIN_USER>"));
        assert!(!scrubbed.contains("kubeadmin"));
    }

    #[test]
    fn scrub_replaces_password_assignments() {
        let text = "password: Sup3rSecret!";
        let scrubbed = scrub_cluster_specifics(text);
        assert!(scrubbed.contains("<CLUSTER_ADMIN_PASSWORD>"));
        assert!(!scrubbed.contains("Sup3rSecret"));
    }

    #[test]
    fn write_artifacts_produces_both_mandatory_files() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), &synthesis()).unwrap();
        assert!(dir.path().join("Test-Cases.md").exists());
        assert!(dir.path().join("Complete-Analysis.md").exists());
    }

    #[test]
    fn degrades_gracefully_with_no_upstream_data() {
        let mut synthesis = synthesis();
        synthesis.test_patterns.clear();
        synthesis.successful_agents = 0;
        synthesis.total_agents = 4;
        let cases = derive_test_cases(&synthesis);
        assert!(!cases.is_empty());
    }
}
