//! End-to-end checks of the `qa-suite` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

fn qa_suite() -> Command {
    let mut cmd = Command::cargo_bin("qa-suite").expect("binary built");
    for var in [
        "QA_PROJECT_ROOT",
        "HEALTHAPI_HOST",
        "HEALTHAPI_PORT",
        "QA_COMMAND_TIMEOUT_SECS",
        "SONAR_HOST_URL",
        "SONAR_TOKEN",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    qa_suite()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            contains("run")
                .and(contains("probe"))
                .and(contains("sonar"))
                .and(contains("perf"))
                .and(contains("security")),
        );
}

#[test]
fn test_unknown_category_is_rejected_before_running() {
    let dir = tempfile::tempdir().expect("tempdir");

    qa_suite()
        .arg("--project-root")
        .arg(dir.path())
        .args(["run", "--category", "smoke"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unknown category 'smoke'").and(contains("unit_tests")));

    // nothing ran, so nothing was written
    assert!(!dir.path().join("docs").exists());
}

#[test]
fn test_single_category_failure_writes_one_category_report() {
    let dir = tempfile::tempdir().expect("tempdir");

    // no contract tests exist here, so the category fails whether or not pytest is installed
    qa_suite()
        .arg("--project-root")
        .arg(dir.path())
        .args(["--timeout", "60", "run", "--category", "contract"])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("QA SUITE FINAL REPORT").and(contains("FAILED")));

    let path = dir.path().join("docs/coverage_report/qa_contract_tests_summary.json");
    let raw = std::fs::read_to_string(&path).expect("summary written");
    let summary: Value = serde_json::from_str(&raw).expect("valid json");

    assert_eq!(summary["overall_status"], "FAILED");
    assert_eq!(summary["total_categories"], 1);
    assert_eq!(summary["passed_categories"], 0);
    let categories = summary["categories"].as_object().expect("categories map");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories["contract_tests"]["passed"], false);

    assert!(!dir.path().join("docs/coverage_report/qa_suite_summary.json").exists());
}

#[test]
fn test_single_category_run_keeps_full_suite_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reports = dir.path().join("docs/coverage_report");
    std::fs::create_dir_all(&reports).expect("reports dir");
    let full = reports.join("qa_suite_summary.json");
    let seeded = r#"{"overall_status":"PASSED","total_categories":7,"passed_categories":7}"#;
    std::fs::write(&full, seeded).expect("seed full report");

    qa_suite()
        .arg("--project-root")
        .arg(dir.path())
        .args(["--timeout", "60", "run", "--category", "contract"])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("qa_contract_tests_summary.json"));

    assert_eq!(std::fs::read_to_string(&full).expect("full report"), seeded);
    assert!(reports.join("qa_contract_tests_summary.json").exists());
}

#[test]
fn test_perf_unknown_profile_is_usage_error() {
    qa_suite()
        .args(["perf", "--profile", "soak"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("soak"));
}

#[test]
fn test_security_owasp_skips_unreachable_target() {
    let dir = tempfile::tempdir().expect("tempdir");

    qa_suite()
        .arg("--project-root")
        .arg(dir.path())
        .args(["--host", "127.0.0.1", "--port", "1", "security", "--mode", "owasp"])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("not available"));
}

#[test]
fn test_probe_unreachable_target_fails() {
    qa_suite()
        .args(["--host", "127.0.0.1", "--port", "1", "probe"])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("/health").and(contains("✗")));
}
