//! Standalone security runner.
//!
//! Two tests: a basic scan of the target's HTTP surface (five checks made
//! directly over HTTP) and the OWASP pytest suite. Both first confirm the
//! target answers `GET /health` with 200. Artifacts go to
//! `<reports>/security/`.

use crate::category::CommandSpec;
use crate::config::QaConfig;
use crate::executor::CommandExecutor;
use crate::obs;
use crate::report::write_json_report;
use crate::result::{BatchSummary, ExecutionResult};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = concat!("HealthAPI-QA-Security/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const BASIC_SCAN_FILE: &str = "basic_security_scan.json";
pub const SECURITY_SUMMARY_FILE: &str = "security_suite_summary.json";

const SECURITY_HEADERS: [&str; 3] = ["X-Content-Type-Options", "X-Frame-Options", "X-XSS-Protection"];
const DISCLOSING_HEADERS: [&str; 3] = ["Server", "X-Powered-By", "X-AspNet-Version"];
const LEAK_MARKERS: [&str; 3] = ["traceback", "stack trace", "internal server error"];
const MISSING_PATH: &str = "/nonexistent-endpoint-test";

/// One check of the basic scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,

    /// Offending headers, methods or markers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<String>,
}

impl SecurityCheck {
    fn new(name: &str, findings: Vec<String>, ok: &str, failed: impl FnOnce(&[String]) -> String) -> Self {
        let passed = findings.is_empty();
        let message = if passed { ok.to_string() } else { failed(&findings) };
        Self {
            name: name.to_string(),
            passed,
            message,
            findings,
        }
    }

    fn failed(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.into(),
            findings: Vec::new(),
        }
    }
}

/// Everything the basic scan observed, as written to `basic_security_scan.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub checks: Vec<SecurityCheck>,
}

impl ScanReport {
    pub fn check(&self, name: &str) -> Option<&SecurityCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Result of the basic scan. Succeeds whenever the scan could run,
/// regardless of how many checks passed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasicScanOutcome {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of the OWASP pytest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwaspOutcome {
    pub host: String,
    pub success: bool,
    pub html_report: String,
    pub json_report: String,

    /// Pytest's final "N passed, M failed" line, when one was printed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry of the security suite summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "test_type", rename_all = "snake_case")]
pub enum SecurityTestResult {
    BasicScan(BasicScanOutcome),
    #[serde(rename = "owasp_security")]
    Owasp(OwaspOutcome),
}

impl SecurityTestResult {
    pub fn success(&self) -> bool {
        match self {
            SecurityTestResult::BasicScan(o) => o.success,
            SecurityTestResult::Owasp(o) => o.success,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SecurityTestResult::BasicScan(_) => "Basic Security Scan",
            SecurityTestResult::Owasp(_) => "OWASP Security Tests",
        }
    }
}

/// Location of the security suite summary.
pub fn suite_summary_path(config: &QaConfig) -> PathBuf {
    config.security_dir().join(SECURITY_SUMMARY_FILE)
}

/// Runs the security tests against the configured target.
pub struct SecurityTestRunner<'a> {
    config: &'a QaConfig,
    executor: Arc<dyn CommandExecutor>,
    client: reqwest::Client,
    base_url: String,
}

impl<'a> SecurityTestRunner<'a> {
    pub fn new(config: &'a QaConfig, executor: Arc<dyn CommandExecutor>) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            config,
            executor,
            client,
            base_url: config.target_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True iff `GET /health` answers 200 within the request timeout.
    pub async fn target_available(&self) -> bool {
        match self.client.get(self.url("/health")).send().await {
            Ok(response) => response.status().as_u16() == 200,
            Err(e) => {
                warn!(event = "security.unavailable", url = %self.base_url, error = %e, "Target not reachable");
                false
            }
        }
    }

    pub fn owasp_command(&self) -> CommandSpec {
        let html = self.config.report_arg("security/owasp_security_report.html");
        let json = self.config.report_arg("security/owasp_security_report.json");
        CommandSpec::new(
            "OWASP Security Tests",
            vec![
                "pytest".to_string(),
                "tests/security/test_owasp_security.py".to_string(),
                "-v".to_string(),
                "--tb=short".to_string(),
                format!("--html={}", html),
                "--json-report".to_string(),
                format!("--json-report-file={}", json),
                "-m".to_string(),
                "security".to_string(),
            ],
            self.config.command_timeout(),
        )
    }

    /// Run the OWASP pytest suite. Skipped, and failed, when the target is down.
    pub async fn run_owasp(&self) -> OwaspOutcome {
        let mut outcome = OwaspOutcome {
            host: self.base_url.clone(),
            success: false,
            html_report: self.config.report_arg("security/owasp_security_report.html"),
            json_report: self.config.report_arg("security/owasp_security_report.json"),
            summary_line: None,
            execution: None,
            error: None,
        };

        if !self.target_available().await {
            outcome.error = Some("target API is not available".to_string());
            return outcome;
        }

        self.ensure_dir();
        info!(event = "security.owasp_started", host = %self.base_url, "Running OWASP security tests");
        let execution = self.executor.execute(&self.owasp_command()).await;
        outcome.success = execution.success;
        outcome.summary_line = pytest_summary_line(&execution.stdout);
        if !execution.success {
            outcome.error = execution.error.clone();
        }
        info!(event = "security.owasp_finished", success = outcome.success, "OWASP security tests finished");
        outcome.execution = Some(execution);
        outcome
    }

    /// Run the five HTTP checks and write `basic_security_scan.json`.
    pub async fn run_basic_scan(&self) -> BasicScanOutcome {
        if !self.target_available().await {
            return BasicScanOutcome {
                success: false,
                report: None,
                report_file: None,
                error: Some("target API is not available".to_string()),
            };
        }

        let checks = vec![
            self.check_ssl(),
            self.check_security_headers().await,
            self.check_info_disclosure().await,
            self.check_http_methods().await,
            self.check_error_handling().await,
        ];
        for check in &checks {
            info!(
                event = "security.check",
                check = %check.name,
                passed = check.passed,
                "{}: {}",
                check.name,
                check.message
            );
        }

        let report = ScanReport {
            timestamp: Utc::now(),
            host: self.base_url.clone(),
            checks,
        };
        let path = self.config.security_dir().join(BASIC_SCAN_FILE);
        let report_file = match write_json_report(&path, &report) {
            Ok(()) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                obs::emit_report_error(&format!("{:#}", e));
                None
            }
        };

        BasicScanOutcome {
            success: true,
            report: Some(report),
            report_file,
            error: None,
        }
    }

    /// Basic scan then OWASP; the summary is written to `security_suite_summary.json`.
    pub async fn run_suite(&self) -> BatchSummary<SecurityTestResult> {
        let results = vec![
            SecurityTestResult::BasicScan(self.run_basic_scan().await),
            SecurityTestResult::Owasp(self.run_owasp().await),
        ];
        let summary = BatchSummary::new(results, SecurityTestResult::success);

        if let Err(e) = write_json_report(&suite_summary_path(self.config), &summary) {
            obs::emit_report_error(&format!("{:#}", e));
        }
        info!(
            event = "security_suite.finished",
            successful = summary.successful_tests,
            total = summary.total_tests,
            "Security suite: {}/{} tests succeeded",
            summary.successful_tests,
            summary.total_tests
        );
        summary
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ensure_dir(&self) {
        if let Err(e) = std::fs::create_dir_all(self.config.security_dir()) {
            warn!(event = "security.reports_dir", error = %e, "Could not create security report directory");
        }
    }

    fn check_ssl(&self) -> SecurityCheck {
        if self.base_url.starts_with("https://") {
            SecurityCheck {
                name: "SSL/TLS".to_string(),
                passed: true,
                message: "target is served over HTTPS".to_string(),
                findings: Vec::new(),
            }
        } else {
            SecurityCheck::failed("SSL/TLS", "target is not served over HTTPS")
        }
    }

    async fn health_headers(&self) -> std::result::Result<HeaderMap, reqwest::Error> {
        let response = self.client.get(self.url("/health")).send().await?;
        Ok(response.headers().clone())
    }

    async fn check_security_headers(&self) -> SecurityCheck {
        const NAME: &str = "Security Headers";
        match self.health_headers().await {
            Ok(headers) => {
                let missing = SECURITY_HEADERS
                    .into_iter()
                    .filter(|h| !headers.contains_key(*h))
                    .map(|h| h.to_string())
                    .collect();
                SecurityCheck::new(NAME, missing, "all security headers present", |m| {
                    format!("missing headers: {}", m.join(", "))
                })
            }
            Err(e) => SecurityCheck::failed(NAME, e.to_string()),
        }
    }

    async fn check_info_disclosure(&self) -> SecurityCheck {
        const NAME: &str = "Information Disclosure";
        match self.health_headers().await {
            Ok(headers) => {
                let disclosed = DISCLOSING_HEADERS
                    .into_iter()
                    .filter_map(|h| {
                        headers
                            .get(h)
                            .map(|v| format!("{}: {}", h, v.to_str().unwrap_or("<binary>")))
                    })
                    .collect();
                SecurityCheck::new(NAME, disclosed, "no server details disclosed", |d| {
                    format!("{} header(s) disclose server details", d.len())
                })
            }
            Err(e) => SecurityCheck::failed(NAME, e.to_string()),
        }
    }

    /// TRACE, CONNECT and DELETE must be refused with 405 or 501. A request
    /// that fails outright counts as refused.
    async fn check_http_methods(&self) -> SecurityCheck {
        let mut allowed = Vec::new();
        for method in [Method::TRACE, Method::CONNECT, Method::DELETE] {
            if let Ok(response) = self.client.request(method.clone(), self.url("/health")).send().await {
                if !matches!(response.status().as_u16(), 405 | 501) {
                    allowed.push(method.to_string());
                }
            }
        }
        SecurityCheck::new("HTTP Methods", allowed, "dangerous methods refused", |a| {
            format!("dangerous methods allowed: {}", a.join(", "))
        })
    }

    async fn check_error_handling(&self) -> SecurityCheck {
        const NAME: &str = "Error Handling";
        let response = match self.client.get(self.url(MISSING_PATH)).send().await {
            Ok(response) => response,
            Err(e) => return SecurityCheck::failed(NAME, e.to_string()),
        };
        let status = response.status().as_u16();
        if status != 404 {
            return SecurityCheck::failed(NAME, format!("unknown endpoint returned {} instead of 404", status));
        }
        match response.text().await {
            Ok(body) => {
                let body = body.to_lowercase();
                let leaked = LEAK_MARKERS
                    .into_iter()
                    .filter(|m| body.contains(*m))
                    .map(|m| m.to_string())
                    .collect();
                SecurityCheck::new(NAME, leaked, "error responses leak nothing", |l| {
                    format!("error response leaks: {}", l.join(", "))
                })
            }
            Err(e) => SecurityCheck::failed(NAME, e.to_string()),
        }
    }
}

/// First pytest line mentioning both "passed" and "failed".
fn pytest_summary_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|l| l.contains("passed") && l.contains("failed"))
        .map(|l| l.trim().to_string())
}
