//! `qe-analyze` — the pipeline-failure analyzer entry point (spec §6):
//! ingests a Jenkins build URL, builds per-test evidence, classifies each
//! failure, and writes `analysis-results.json` + `report.md` under a
//! per-run directory.
//!
//! Exit codes match `qe-generate`: `0` complete, `1` fatal/invalid input,
//! `130` user interrupt.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use qe_cli::config::Config;
use qe_cli::{build_mcp_client, telemetry};
use qe_core::{AggregatedEvidencePackage, QeError};
use qe_evidence::{ConsoleInput, EnvironmentInput, EvidencePackageBuilder, FailedTestInput, RepositoryInput};
use qe_mcp_client::{EnvironmentClient, JenkinsClient};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "qe-analyze")]
#[command(about = "Classify Jenkins test failures as product, automation, or infrastructure bugs")]
#[command(version = qe_cli::VERSION)]
struct Cli {
    /// Jenkins build URL, e.g. https://jenkins.example.com/job/acm-e2e/123/
    build_url: String,

    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,
}

/// Splits a Jenkins build URL into `(job_path, build_number)`. Accepts
/// both `/job/<path>/<number>/` and a bare trailing `<number>` with no
/// trailing slash.
fn parse_build_url(url: &str) -> anyhow::Result<(String, String)> {
    let trimmed = url.trim().trim_end_matches('/');
    let job_marker = "/job/";
    let job_start = trimmed.find(job_marker).ok_or_else(|| anyhow::anyhow!("'{url}' does not look like a Jenkins job URL (expected a '/job/' segment)"))?;
    let after_job = &trimmed[job_start + job_marker.len()..];
    let (job_path, build_number) = after_job.rsplit_once('/').unwrap_or(("", after_job));
    let job_path = job_path.replace("/job/", "/");
    if job_path.is_empty() || build_number.is_empty() || !build_number.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!("'{url}' did not yield both a job path and a numeric build number");
    }
    Ok((job_path, build_number.to_string()))
}

/// Pulls failing test cases out of the `testReport`-shaped JSON returned
/// by `JenkinsClient::get_test_report` (spec §3 console/test-report
/// evidence; shape mirrors `mocks::sample_test_report`).
fn failed_tests_from_report(report: &serde_json::Value) -> Vec<FailedTestInput> {
    let mut failures = Vec::new();
    let Some(suites) = report.get("suites").and_then(|v| v.as_array()) else {
        return failures;
    };
    for suite in suites {
        let Some(cases) = suite.get("cases").and_then(|v| v.as_array()) else {
            continue;
        };
        for case in cases {
            let status = case.get("status").and_then(|v| v.as_str()).unwrap_or("PASSED");
            if status.eq_ignore_ascii_case("PASSED") || status.eq_ignore_ascii_case("SUCCESS") || status.eq_ignore_ascii_case("SKIPPED") {
                continue;
            }
            let test_name = case.get("name").and_then(|v| v.as_str()).unwrap_or("unknown_test").to_string();
            let error_message = case.get("errorDetails").and_then(|v| v.as_str()).unwrap_or("test failed with no error detail").to_string();
            let stack_trace = case.get("errorStackTrace").and_then(|v| v.as_str()).unwrap_or("").to_string();
            failures.push(FailedTestInput {
                test_name,
                error_message,
                stack_trace,
            });
        }
    }
    failures
}

/// Extracts console error lines for `ConsoleInput` from whichever shape
/// `JenkinsClient::get_console` returned (a `content` string, or a `lines`
/// array — both appear across the fixtures this platform's MCP servers
/// produce).
fn console_errors_from(console: &serde_json::Value) -> Vec<String> {
    let text = if let Some(content) = console.get("content").and_then(|v| v.as_str()) {
        content.to_string()
    } else if let Some(lines) = console.get("lines").and_then(|v| v.as_array()) {
        lines.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join("\n")
    } else {
        String::new()
    };

    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("error") || lower.contains("fail") || lower.contains("refused") || lower.contains("500")
        })
        .map(str::to_string)
        .collect()
}

fn render_report_md(package: &AggregatedEvidencePackage) -> String {
    let mut out = format!("# Pipeline Failure Analysis — {}\n\n", package.build_number);
    out.push_str(&format!("Jenkins build: {}\n\n", package.jenkins_url));
    out.push_str(&format!("Total failures: {}\n\n", package.total_failures));

    out.push_str("## Classification Summary\n\n");
    if package.classification_counts.is_empty() {
        out.push_str("No failing tests were reported for this build.\n\n");
    } else {
        for (classification, count) in &package.classification_counts {
            out.push_str(&format!("- {classification}: {count}\n"));
        }
        out.push('\n');
    }

    out.push_str("## Per-Test Detail\n\n");
    for test in &package.per_test {
        out.push_str(&format!(
            "### {}\n\n- Classification: {}\n- Confidence: {:.2} ({:?})\n- Category: {:?}\n- Error: {}\n\n",
            test.test.test_name,
            test.scores.primary(),
            test.confidence.final_confidence,
            test.confidence.confidence_level,
            test.test.failure_category,
            test.test.error_message,
        ));
    }

    out
}

fn write_artifacts(run_dir: &Path, package: &AggregatedEvidencePackage) -> Result<(), QeError> {
    let json = serde_json::to_string_pretty(package).map_err(|e| QeError::Integrity(format!("failed to serialize analysis-results.json: {e}")))?;
    std::fs::write(run_dir.join("analysis-results.json"), json).map_err(|e| QeError::Integrity(format!("failed to write analysis-results.json: {e}")))?;
    std::fs::write(run_dir.join("report.md"), render_report_md(package)).map_err(|e| QeError::Integrity(format!("failed to write report.md: {e}")))?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (job_path, build_number) = match parse_build_url(&cli.build_url) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: invalid configuration: {e:#}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = telemetry::init_telemetry(&config.logging) {
        eprintln!("error: failed to initialize logging: {e:#}");
        return ExitCode::from(1);
    }

    info!(job_path = %job_path, build_number = %build_number, "starting pipeline failure analysis");

    let analysis = tokio::select! {
        result = run_analysis(&cli.build_url, &job_path, &build_number) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt signal");
            return ExitCode::from(130);
        }
    };

    let package = match analysis {
        Ok(package) => package,
        Err(e) => {
            error!(error = %e, "analysis failed");
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    let run_dir: PathBuf = Path::new(&config.runtime.output_root).join("runs").join(&job_path).join(format!("{}_{}", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"), build_number));

    if let Err(e) = std::fs::create_dir_all(&run_dir) {
        error!(error = %e, "fatal: could not create run directory");
        eprintln!("error: could not create run directory {}: {e}", run_dir.display());
        return ExitCode::from(1);
    }

    match write_artifacts(&run_dir, &package) {
        Ok(()) => {
            info!(run_directory = %run_dir.display(), total_failures = package.total_failures, "analysis complete");
            println!("{}", run_dir.display());
            ExitCode::from(0)
        }
        Err(e) => {
            error!(error = %e, "fatal: could not write analyzer artifacts");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run_analysis(build_url: &str, job_path: &str, build_number: &str) -> Result<AggregatedEvidencePackage, QeError> {
    let mcp = build_mcp_client();
    let jenkins = JenkinsClient::new(mcp.clone(), "jenkins");
    let environment = EnvironmentClient::new(mcp.clone(), "environment");

    let test_report = jenkins.get_test_report(job_path, build_number).await;
    let failed_tests = if test_report.success {
        failed_tests_from_report(&test_report.data)
    } else {
        warn!(error = ?test_report.error_message, "could not retrieve Jenkins test report; proceeding with zero failures");
        Vec::new()
    };

    let console = jenkins.get_console(job_path, build_number).await;
    let console_input = ConsoleInput {
        key_errors: if console.success { console_errors_from(&console.data) } else { Vec::new() },
    };

    let health = environment.check_health("default").await;
    let environment_input = if health.success {
        EnvironmentInput {
            healthy: health.data.get("healthy").and_then(|v| v.as_bool()).unwrap_or(true),
            accessible: health.data.get("accessible").and_then(|v| v.as_bool()).unwrap_or(true),
            api_accessible: health.data.get("api_accessible").and_then(|v| v.as_bool()).unwrap_or(true),
            target_cluster: health.data.get("cluster").and_then(|v| v.as_str()).map(str::to_string),
        }
    } else {
        EnvironmentInput::default()
    };

    let builder = EvidencePackageBuilder::new();
    Ok(builder.build_package(build_url, build_number, &failed_tests, &environment_input, &RepositoryInput::default(), &console_input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_standard_jenkins_job_url() {
        let (job_path, build_number) = parse_build_url("https://jenkins.example.com/job/acm-e2e/123/").unwrap();
        assert_eq!(job_path, "acm-e2e");
        assert_eq!(build_number, "123");
    }

    #[test]
    fn parses_nested_job_path() {
        let (job_path, build_number) = parse_build_url("https://jenkins.example.com/job/folder/job/acm-e2e/45").unwrap();
        assert_eq!(job_path, "folder/acm-e2e");
        assert_eq!(build_number, "45");
    }

    #[test]
    fn rejects_url_without_job_segment() {
        assert!(parse_build_url("https://jenkins.example.com/view/all/").is_err());
    }

    #[test]
    fn rejects_non_numeric_build_number() {
        assert!(parse_build_url("https://jenkins.example.com/job/acm-e2e/latest/").is_err());
    }

    #[test]
    fn extracts_failed_tests_from_report_shape() {
        let report = json!({
            "suites": [{
                "cases": [
                    {"name": "test_a", "status": "PASSED"},
                    {"name": "test_b", "status": "FAILED", "errorDetails": "500 Internal Server Error"},
                ]
            }]
        });
        let failures = failed_tests_from_report(&report);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].test_name, "test_b");
    }

    #[test]
    fn console_errors_from_content_filters_to_error_lines() {
        let console = json!({"content": "14:00 starting up\n14:01 ERROR: connection refused\n14:02 done"});
        let errors = console_errors_from(&console);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("connection refused"));
    }
}
