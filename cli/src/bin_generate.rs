//! `qe-generate` — the test-case generator entry point (spec §6): ingests
//! a JIRA ticket id, runs the phased orchestrator, and writes
//! `Test-Cases.md` + `Complete-Analysis.md` under a per-run directory.
//!
//! Exit codes (spec §6, normative): `0` on a completed run, `1` on a
//! fatal orchestration error (no run directory produced) or invalid
//! input, `130` on user interrupt (Ctrl-C).

use std::process::ExitCode;

use clap::Parser;
use qe_cli::config::Config;
use qe_cli::{build_mcp_client, telemetry};
use qe_core::RunOutcome;
use qe_orchestrator::Orchestrator;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "qe-generate")]
#[command(about = "Generate an end-to-end test plan from a JIRA ticket")]
#[command(version = qe_cli::VERSION)]
struct Cli {
    /// JIRA ticket id to generate a test plan for, e.g. ACM-22079.
    jira_id: String,

    /// Configuration file path (defaults to `CONFIG_FILE` env var, then
    /// built-in defaults).
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,
}

fn validate_jira_id(jira_id: &str) -> anyhow::Result<()> {
    let valid = jira_id.contains('-') && jira_id.split('-').all(|part| !part.is_empty()) && jira_id.chars().any(|c| c.is_ascii_digit());
    if !valid {
        anyhow::bail!("'{jira_id}' does not look like a JIRA ticket id (expected PROJECT-NUMBER, e.g. ACM-22079)");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = validate_jira_id(&cli.jira_id) {
        eprintln!("error: {e}");
        return ExitCode::from(1);
    }

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

    info!(jira_id = %cli.jira_id, "starting test-case generation run");

    let mcp = build_mcp_client();
    let orchestrator = Orchestrator::new(config.runtime.output_root.as_str(), mcp);

    let result = tokio::select! {
        result = orchestrator.execute_full_workflow(&cli.jira_id) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt signal, awaiting in-flight agents");
            return ExitCode::from(130);
        }
    };

    match result.outcome {
        RunOutcome::Done if result.success => {
            info!(run_directory = %result.run_directory, "run complete");
            println!("{}", result.run_directory);
            ExitCode::from(0)
        }
        _ => {
            error!(error = ?result.error_message, run_directory = %result.run_directory, "run did not complete");
            if let Some(message) = &result.error_message {
                eprintln!("error: {message}");
            }
            ExitCode::from(1)
        }
    }
}
