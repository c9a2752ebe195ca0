//! SonarQube analysis runner.
//!
//! Waits for the server, optionally runs the test suite with coverage,
//! produces static-analysis reports, runs `sonar-scanner`, then reads the
//! project's quality gate.

use crate::category::CommandSpec;
use crate::config::QaConfig;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::result::ExecutionResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const DEFAULT_SONAR_HOST: &str = "http://localhost:9000";
pub const DEFAULT_PROJECT_KEY: &str = "healthapi-qa-framework";

/// SonarQube connection and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SonarConfig {
    pub host: String,
    pub project_key: String,
    pub token: Option<String>,
    pub skip_tests: bool,

    /// How long to wait for the server to report `UP`.
    pub max_wait_secs: u64,
    pub poll_interval_secs: u64,

    /// Pause before reading the quality gate so the server can process the upload.
    pub processing_delay_secs: u64,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SONAR_HOST.to_string(),
            project_key: DEFAULT_PROJECT_KEY.to_string(),
            token: None,
            skip_tests: false,
            max_wait_secs: 300,
            poll_interval_secs: 10,
            processing_delay_secs: 30,
        }
    }
}

impl SonarConfig {
    pub fn host_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard?id={}", self.host_url(), self.project_key)
    }
}

/// One failing (or passing) quality gate condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GateCondition {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metric_key: String,
    #[serde(default)]
    pub actual_value: Option<String>,
    #[serde(default)]
    pub error_threshold: Option<String>,
}

/// Quality gate verdict as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityGateStatus {
    /// `OK`, `ERROR`, or whatever else the server reports.
    pub status: String,
    pub conditions: Vec<GateCondition>,
}

impl QualityGateStatus {
    /// Parse the body of `api/qualitygates/project_status`.
    pub fn from_response(body: &serde_json::Value) -> Self {
        let project = body.get("projectStatus");
        let status = project
            .and_then(|p| p.get("status"))
            .and_then(|s| s.as_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let conditions = project
            .and_then(|p| p.get("conditions"))
            .and_then(|c| serde_json::from_value::<Vec<GateCondition>>(c.clone()).ok())
            .unwrap_or_default();
        Self { status, conditions }
    }

    pub fn passed(&self) -> bool {
        self.status == "OK"
    }

    pub fn failing_conditions(&self) -> impl Iterator<Item = &GateCondition> {
        self.conditions.iter().filter(|c| c.status == "ERROR")
    }
}

/// Everything a full analysis produced.
#[derive(Debug, Clone)]
pub struct SonarOutcome {
    pub server_up: bool,

    /// `None` when tests were skipped or the server never came up.
    pub tests_passed: Option<bool>,

    pub scanner: Option<ExecutionResult>,

    /// Gate verdict, or the reason it could not be read.
    pub quality_gate: Option<std::result::Result<QualityGateStatus, String>>,

    pub dashboard_url: String,
}

impl SonarOutcome {
    /// The analysis succeeds iff the server came up and the scanner succeeded.
    /// Test failures and gate read errors are reported but do not fail it.
    pub fn success(&self) -> bool {
        self.server_up && self.scanner.as_ref().is_some_and(|s| s.success)
    }
}

/// Drives a SonarQube analysis of the project.
pub struct SonarRunner<'a> {
    sonar: SonarConfig,
    qa: &'a QaConfig,
    executor: Arc<dyn CommandExecutor>,
    client: reqwest::Client,
}

impl<'a> SonarRunner<'a> {
    pub fn new(sonar: SonarConfig, qa: &'a QaConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            sonar,
            qa,
            executor,
            client,
        })
    }

    /// `GET api/system/status` reports `UP`.
    pub async fn server_is_up(&self) -> bool {
        let url = format!("{}/api/system/status", self.sonar.host_url());
        let response = match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(r) if r.status() == reqwest::StatusCode::OK => r,
            _ => return false,
        };
        match response.json::<serde_json::Value>().await {
            Ok(body) => body.get("status").and_then(|s| s.as_str()) == Some("UP"),
            Err(_) => false,
        }
    }

    /// Poll the server until it is up or `max_wait_secs` elapses.
    pub async fn wait_for_server(&self) -> bool {
        info!(event = "sonar.wait", host = %self.sonar.host_url(), "Checking SonarQube availability");
        let deadline = Instant::now() + Duration::from_secs(self.sonar.max_wait_secs);
        loop {
            if self.server_is_up().await {
                info!(event = "sonar.up", "SonarQube is available");
                return true;
            }
            if Instant::now() >= deadline {
                error!(event = "sonar.unavailable", "SonarQube is not available after timeout");
                return false;
            }
            info!("Waiting for SonarQube... (retry in {}s)", self.sonar.poll_interval_secs);
            tokio::time::sleep(Duration::from_secs(self.sonar.poll_interval_secs)).await;
        }
    }

    pub fn coverage_command(&self) -> CommandSpec {
        CommandSpec::new(
            "Tests with Coverage",
            to_args(&[
                "pytest",
                "tests/",
                "--cov=api",
                "--cov-report=xml:coverage.xml",
                "--cov-report=html:htmlcov",
                "--cov-report=term-missing",
                "--junit-xml=test-results.xml",
                "-v",
            ]),
            self.qa.command_timeout(),
        )
    }

    pub fn static_analysis_commands(&self) -> Vec<CommandSpec> {
        let timeout = self.qa.command_timeout();
        vec![
            CommandSpec::new(
                "Pylint",
                to_args(&["pylint", "api/", "tests/", "--output-format=json", "--reports=yes"]),
                timeout,
            ),
            CommandSpec::new(
                "Bandit",
                to_args(&["bandit", "-r", "api/", "-f", "json", "-o", "bandit-report.json"]),
                timeout,
            ),
            CommandSpec::new(
                "Flake8",
                to_args(&[
                    "flake8",
                    "api/",
                    "tests/",
                    "--format=json",
                    "--output-file=flake8-report.json",
                ]),
                timeout,
            ),
        ]
    }

    pub fn scanner_command(&self) -> CommandSpec {
        let mut command = vec![
            "sonar-scanner".to_string(),
            format!("-Dsonar.host.url={}", self.sonar.host_url()),
            format!("-Dsonar.projectKey={}", self.sonar.project_key),
            "-Dsonar.sources=api/".to_string(),
            "-Dsonar.tests=tests/".to_string(),
            "-Dsonar.python.coverage.reportPaths=coverage.xml".to_string(),
            "-Dsonar.python.xunit.reportPath=test-results.xml".to_string(),
            "-Dsonar.sourceEncoding=UTF-8".to_string(),
        ];
        if let Some(token) = &self.sonar.token {
            command.push(format!("-Dsonar.login={}", token));
        }
        CommandSpec::new("SonarQube Scanner", command, self.qa.command_timeout())
    }

    /// Read the project's quality gate, after the processing delay.
    pub async fn quality_gate_status(&self) -> std::result::Result<QualityGateStatus, String> {
        info!(event = "sonar.gate_wait", "Waiting for analysis processing");
        tokio::time::sleep(Duration::from_secs(self.sonar.processing_delay_secs)).await;

        let url = format!("{}/api/qualitygates/project_status", self.sonar.host_url());
        let mut request = self
            .client
            .get(&url)
            .query(&[("projectKey", self.sonar.project_key.as_str())]);
        if let Some(token) = &self.sonar.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }
        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(QualityGateStatus::from_response(&body))
    }

    /// Server check, optional tests, static analysis, scanner, quality gate.
    pub async fn run_full_analysis(&self) -> SonarOutcome {
        info!(
            event = "sonar.started",
            project = %self.sonar.project_key,
            host = %self.sonar.host_url(),
            "Starting SonarQube analysis"
        );
        let mut outcome = SonarOutcome {
            server_up: false,
            tests_passed: None,
            scanner: None,
            quality_gate: None,
            dashboard_url: self.sonar.dashboard_url(),
        };

        if !self.wait_for_server().await {
            return outcome;
        }
        outcome.server_up = true;

        if !self.sonar.skip_tests {
            let tests = self.executor.execute(&self.coverage_command()).await;
            if !tests.success {
                warn!(event = "sonar.tests_failed", "Tests failed, continuing with analysis");
            }
            outcome.tests_passed = Some(tests.success);
        }

        // Report files are best effort; the scanner tolerates missing ones.
        for spec in self.static_analysis_commands() {
            self.executor.execute(&spec).await;
        }

        let scanner = self.executor.execute(&self.scanner_command()).await;
        let scanner_ok = scanner.success;
        outcome.scanner = Some(scanner);
        if !scanner_ok {
            error!(event = "sonar.scanner_failed", "SonarQube Scanner failed");
            return outcome;
        }

        let gate = self.quality_gate_status().await;
        match &gate {
            Ok(status) if status.passed() => info!(event = "sonar.gate", status = "OK", "Quality Gate: PASSED"),
            Ok(status) if status.status == "ERROR" => {
                error!(event = "sonar.gate", status = "ERROR", "Quality Gate: FAILED");
                for condition in status.failing_conditions() {
                    error!(
                        metric = %condition.metric_key,
                        actual = ?condition.actual_value,
                        threshold = ?condition.error_threshold,
                        "condition failed"
                    );
                }
            }
            Ok(status) => warn!(event = "sonar.gate", status = %status.status, "Quality Gate: {}", status.status),
            Err(e) => warn!(event = "sonar.gate_error", error = %e, "Could not read Quality Gate"),
        }
        outcome.quality_gate = Some(gate);

        info!(event = "sonar.finished", dashboard = %outcome.dashboard_url, "SonarQube analysis finished");
        outcome
    }
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}
