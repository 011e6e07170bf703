//! Phase 0 (initialization cleanup) and Phase 5 (comprehensive cleanup)
//! services, spec §4.8. Both are plain filesystem sweeps with no agent
//! fan-out; the orchestrator runs them synchronously at the start and end
//! of a workflow run respectively. Grounded on `original_source`'s
//! `test_phase_0_cleanup_mock.py` and `test_phase_5_cleanup_mock.py`.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

/// Result of a cleanup sweep, reported back as part of the corresponding
/// `PhaseResult` (as JSON in a synthetic agent-less phase, since neither
/// cleanup phase has agents of its own).
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub files_removed: u64,
    pub directories_cleaned: u64,
    pub total_size_freed_bytes: u64,
    /// Only meaningful for Phase 5: true iff every essential file is still
    /// present after the sweep.
    pub validation_passed: bool,
}

/// Phase 0: purges `<root>/staging/` and `<root>/cache/` if they exist.
/// Never touches `<root>/runs/` — that directory holds other runs' final
/// artifacts, not this run's scratch state. Idempotent: running it twice
/// in a row with nothing new written is a no-op the second time.
pub fn phase0_cleanup(root: &Path) -> CleanupReport {
    let mut report = CleanupReport {
        validation_passed: true,
        ..Default::default()
    };

    for subdir in ["staging", "cache"] {
        let dir = root.join(subdir);
        if !dir.exists() {
            continue;
        }
        sweep_directory(&dir, &mut report);
        report.directories_cleaned += 1;
    }

    info!(
        files_removed = report.files_removed,
        bytes_freed = report.total_size_freed_bytes,
        "phase 0 cleanup complete"
    );
    report
}

fn sweep_directory(dir: &Path, report: &mut CleanupReport) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            sweep_directory(&path, report);
            let _ = fs::remove_dir(&path);
        } else if let Ok(meta) = entry.metadata() {
            report.total_size_freed_bytes += meta.len();
            if fs::remove_file(&path).is_ok() {
                report.files_removed += 1;
            } else {
                warn!(path = %path.display(), "phase 0 cleanup could not remove file");
            }
        }
    }
}

/// Filenames that must survive Phase 5 regardless of run outcome
/// (spec §6 "Essential file"). The analyzer binary's own `report.md` /
/// `analysis-results.json` have no temp-pattern overlap so they never need
/// this whitelist — only the generator's two Markdown artifacts do.
pub const ESSENTIAL_FILES: &[&str] = &["Test-Cases.md", "Complete-Analysis.md"];

/// Temp-file name patterns eligible for Phase 5 removal (spec §4.8). A
/// file must match one of these *and* not be on the essential whitelist
/// to be removed — anything else is left alone, by design: an unmatched,
/// non-essential file is not assumed to be garbage.
fn matches_temp_pattern(filename: &str) -> bool {
    if filename.ends_with(".tmp") {
        return true;
    }
    if filename.contains("_staging.") || filename.contains("_intelligence.") {
        return true;
    }
    if let Some(after) = filename.split("_phase_").nth(1) {
        if after.contains('.') {
            return true;
        }
    }
    if let Some(rest) = filename.strip_prefix("agent_") {
        // agent_*_*.* — at least one more underscore segment before the extension.
        if let Some(dot) = rest.rfind('.') {
            if rest[..dot].contains('_') {
                return true;
            }
        }
    }
    false
}

/// Phase 5: removes every non-essential file in `run_dir` that matches a
/// temp pattern, then validates the essential whitelist survived.
/// Idempotent on the terminal set of files: once only essential files
/// remain, running it again removes nothing and still validates.
pub fn phase5_cleanup(run_dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    if let Ok(entries) = fs::read_dir(run_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if ESSENTIAL_FILES.contains(&filename) {
                continue;
            }
            if matches_temp_pattern(filename) {
                if let Ok(meta) = entry.metadata() {
                    report.total_size_freed_bytes += meta.len();
                }
                if fs::remove_file(&path).is_ok() {
                    report.files_removed += 1;
                } else {
                    warn!(path = %path.display(), "phase 5 cleanup could not remove file");
                }
            }
        }
    }

    report.validation_passed = ESSENTIAL_FILES.iter().all(|name| run_dir.join(name).exists());

    info!(
        files_removed = report.files_removed,
        validation_passed = report.validation_passed,
        "phase 5 cleanup complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn phase0_removes_staging_and_cache_but_never_runs() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("staging")).unwrap();
        fs::create_dir_all(root.path().join("cache")).unwrap();
        fs::create_dir_all(root.path().join("runs/ACM-1")).unwrap();
        fs::write(root.path().join("staging/agent_a_staging.json"), b"{}").unwrap();
        fs::write(root.path().join("cache/entry.json"), b"{}").unwrap();
        fs::write(root.path().join("runs/ACM-1/Test-Cases.md"), b"# x").unwrap();

        let report = phase0_cleanup(root.path());

        assert_eq!(report.files_removed, 2);
        assert!(root.path().join("runs/ACM-1/Test-Cases.md").exists());
        assert!(!root.path().join("staging").exists() || fs::read_dir(root.path().join("staging")).unwrap().count() == 0);
    }

    #[test]
    fn phase0_is_idempotent() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("staging")).unwrap();
        fs::write(root.path().join("staging/x.json"), b"{}").unwrap();
        phase0_cleanup(root.path());
        let second = phase0_cleanup(root.path());
        assert_eq!(second.files_removed, 0);
    }

    #[test]
    fn phase0_on_missing_directories_is_a_noop() {
        let root = tempdir().unwrap();
        let report = phase0_cleanup(root.path());
        assert_eq!(report.files_removed, 0);
    }

    #[test]
    fn phase5_removes_temp_files_preserves_essentials() {
        let run_dir = tempdir().unwrap();
        fs::write(run_dir.path().join("Test-Cases.md"), b"# Test Cases").unwrap();
        fs::write(run_dir.path().join("Complete-Analysis.md"), b"# Analysis").unwrap();
        fs::write(run_dir.path().join("agent_a_jira_staging.json"), b"{}").unwrap();
        fs::write(run_dir.path().join("phase2_phase_5_intermediate.tmp"), b"x").unwrap();
        fs::write(run_dir.path().join("agent_b_documentation_intelligence.json"), b"{}").unwrap();

        let report = phase5_cleanup(run_dir.path());

        assert!(report.validation_passed);
        assert!(run_dir.path().join("Test-Cases.md").exists());
        assert!(run_dir.path().join("Complete-Analysis.md").exists());
        assert!(!run_dir.path().join("agent_a_jira_staging.json").exists());
        assert!(!run_dir.path().join("phase2_phase_5_intermediate.tmp").exists());
        assert!(!run_dir.path().join("agent_b_documentation_intelligence.json").exists());
    }

    #[test]
    fn phase5_validation_fails_when_an_essential_file_is_missing() {
        let run_dir = tempdir().unwrap();
        fs::write(run_dir.path().join("Test-Cases.md"), b"# Test Cases").unwrap();
        let report = phase5_cleanup(run_dir.path());
        assert!(!report.validation_passed);
    }

    #[test]
    fn phase5_leaves_unmatched_non_essential_files_alone() {
        let run_dir = tempdir().unwrap();
        fs::write(run_dir.path().join("Test-Cases.md"), b"# Test Cases").unwrap();
        fs::write(run_dir.path().join("Complete-Analysis.md"), b"# Analysis").unwrap();
        fs::write(run_dir.path().join("notes.txt"), b"keep me").unwrap();

        let report = phase5_cleanup(run_dir.path());

        assert!(report.validation_passed);
        assert!(run_dir.path().join("notes.txt").exists());
        assert_eq!(report.files_removed, 0);
    }

    #[test]
    fn phase5_is_idempotent_on_the_terminal_file_set() {
        let run_dir = tempdir().unwrap();
        fs::write(run_dir.path().join("Test-Cases.md"), b"# Test Cases").unwrap();
        fs::write(run_dir.path().join("Complete-Analysis.md"), b"# Analysis").unwrap();
        fs::write(run_dir.path().join("agent_a_staging.tmp"), b"x").unwrap();

        phase5_cleanup(run_dir.path());
        let second = phase5_cleanup(run_dir.path());
        assert_eq!(second.files_removed, 0);
        assert!(second.validation_passed);
    }
}
