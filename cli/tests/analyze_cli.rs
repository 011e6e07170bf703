//! Black-box test of the `qe-analyze` binary's CLI surface: build-URL
//! validation and exit codes (spec §6).

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn rejects_a_url_with_no_job_segment() {
    Command::cargo_bin("qe-analyze")
        .unwrap()
        .arg("https://jenkins.example.com/view/all/")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("does not look like a Jenkins job URL"));
}

#[test]
fn prints_usage_on_missing_argument() {
    Command::cargo_bin("qe-analyze").unwrap().assert().failure();
}
