//! Load-test and security runners against a scripted executor and the
//! sample Health API.

use async_trait::async_trait;
use healthapi::{AppState, Environment};
use healthapi_qa::{
    CommandExecutor, CommandSpec, ExecutionResult, LoadProfile, LoadTestRunner, QaConfig,
    SecurityTestResult, SecurityTestRunner,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Executor that fails the named commands, passes the rest, and records calls.
struct ScriptedExecutor {
    failing: Vec<String>,
    stdout: String,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    fn new() -> Self {
        Self {
            failing: Vec::new(),
            stdout: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    fn printing(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, spec: &CommandSpec) -> ExecutionResult {
        self.calls.lock().expect("calls lock").push(spec.clone());
        let code = if self.failing.contains(&spec.name) { 1 } else { 0 };
        ExecutionResult::completed(
            &spec.name,
            spec.command.clone(),
            Some(code),
            self.stdout.clone(),
            String::new(),
            0.01,
        )
    }
}

async fn spawn_target() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(healthapi::serve(
        listener,
        AppState::new(Environment::Testing),
        std::future::pending(),
    ));
    port
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve port");
    listener.local_addr().expect("local addr").port()
}

#[tokio::test]
async fn test_single_load_profile_builds_locust_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QaConfig::new(dir.path()).with_target("127.0.0.1", 8000);
    let executor = Arc::new(ScriptedExecutor::new());
    let runner = LoadTestRunner::new(&config, executor.clone());

    let test = LoadProfile::Spike.test().with_users(75);
    let outcome = runner.run(&test).await;

    assert!(outcome.success);
    assert_eq!(outcome.host, "http://127.0.0.1:8000");
    assert_eq!(outcome.csv_stats, "docs/coverage_report/performance/spike_test_stats.csv");
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    let argv = calls[0].command.join(" ");
    assert!(argv.contains("--users 75 --spawn-rate 20 --run-time 30s"));
    assert!(argv.contains("--csv docs/coverage_report/performance/spike_test"));
    assert!(dir.path().join("docs/coverage_report/performance").is_dir());
}

#[tokio::test]
async fn test_load_suite_counts_failures_and_keeps_going() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QaConfig::new(dir.path());
    let executor = Arc::new(ScriptedExecutor::new().failing("Load Test (spike_test)"));
    let runner = LoadTestRunner::new(&config, executor.clone()).with_pause(Duration::ZERO);

    let summary = runner.run_suite().await;

    assert_eq!(summary.total_tests, 4);
    assert_eq!(summary.successful_tests, 3);
    assert_eq!(summary.failed_tests, 1);
    assert!(!summary.passed());
    let names: Vec<_> = executor.calls().into_iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec![
            "Load Test (basic_load)",
            "Load Test (stress_test)",
            "Load Test (spike_test)",
            "Load Test (volume_test)",
        ]
    );

    let path = dir.path().join("docs/coverage_report/performance/performance_suite_summary.json");
    let raw = std::fs::read_to_string(&path).expect("suite summary written");
    let json: Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["total_tests"], 4);
    assert_eq!(json["successful_tests"], 3);
    assert_eq!(json["failed_tests"], 1);
    assert_eq!(json["results"][2]["success"], false);
    assert_eq!(json["results"][2]["test"]["name"], "spike_test");
}

#[tokio::test]
async fn test_owasp_skipped_when_target_down() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QaConfig::new(dir.path()).with_target("127.0.0.1", closed_port());
    let executor = Arc::new(ScriptedExecutor::new());
    let runner = SecurityTestRunner::new(&config, executor.clone()).expect("client");

    let outcome = runner.run_owasp().await;

    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap_or_default().contains("not available"));
    assert!(outcome.execution.is_none());
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_owasp_runs_pytest_with_json_report() {
    let port = spawn_target().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QaConfig::new(dir.path()).with_target("127.0.0.1", port);
    let executor = Arc::new(
        ScriptedExecutor::new()
            .failing("OWASP Security Tests")
            .printing("collected 7 items\n===== 5 passed, 2 failed in 1.20s =====\n"),
    );
    let runner = SecurityTestRunner::new(&config, executor.clone()).expect("client");

    let outcome = runner.run_owasp().await;

    assert!(!outcome.success);
    assert_eq!(outcome.summary_line.as_deref(), Some("===== 5 passed, 2 failed in 1.20s ====="));
    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command[0], "pytest");
    assert!(calls[0].command.contains(&"--json-report".to_string()));
    assert!(calls[0]
        .command
        .contains(&"--json-report-file=docs/coverage_report/security/owasp_security_report.json".to_string()));
    assert_eq!(calls[0].command[calls[0].command.len() - 2..], ["-m", "security"]);
}

#[tokio::test]
async fn test_basic_scan_reports_each_check() {
    let port = spawn_target().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QaConfig::new(dir.path()).with_target("127.0.0.1", port);
    let runner = SecurityTestRunner::new(&config, Arc::new(ScriptedExecutor::new())).expect("client");

    let outcome = runner.run_basic_scan().await;

    assert!(outcome.success);
    let report = outcome.report.expect("scan report");
    assert_eq!(report.checks.len(), 5);

    let ssl = report.check("SSL/TLS").expect("ssl check");
    assert!(!ssl.passed);

    let headers = report.check("Security Headers").expect("headers check");
    assert!(!headers.passed);
    assert_eq!(headers.findings.len(), 3);
    assert!(headers.findings.contains(&"X-Frame-Options".to_string()));

    assert!(report.check("Information Disclosure").expect("disclosure check").passed);
    assert!(report.check("Error Handling").expect("error check").passed);

    let written = dir.path().join("docs/coverage_report/security/basic_security_scan.json");
    let raw = std::fs::read_to_string(&written).expect("scan written");
    let json: Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["checks"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["host"], format!("http://127.0.0.1:{}", port));
}

#[tokio::test]
async fn test_security_suite_against_unreachable_target() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = QaConfig::new(dir.path()).with_target("127.0.0.1", closed_port());
    let executor = Arc::new(ScriptedExecutor::new());
    let runner = SecurityTestRunner::new(&config, executor.clone()).expect("client");

    let summary = runner.run_suite().await;

    assert_eq!(summary.total_tests, 2);
    assert_eq!(summary.successful_tests, 0);
    assert!(matches!(summary.results[0], SecurityTestResult::BasicScan(_)));
    assert!(matches!(summary.results[1], SecurityTestResult::Owasp(_)));
    assert!(executor.calls().is_empty());

    let path = dir.path().join("docs/coverage_report/security/security_suite_summary.json");
    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("summary written")).expect("valid json");
    assert_eq!(json["failed_tests"], 2);
    assert_eq!(json["results"][0]["test_type"], "basic_scan");
    assert_eq!(json["results"][1]["test_type"], "owasp_security");
}
