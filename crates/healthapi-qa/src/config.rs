//! Orchestrator configuration.
//!
//! A single `QaConfig` is built at process start and handed by reference to
//! every component that needs it. Nothing reads process-wide state after
//! construction.

use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the persisted suite summary.
pub const SUMMARY_FILE_NAME: &str = "qa_suite_summary.json";

/// Configuration for a QA suite run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaConfig {
    /// Project root; every command runs with this as its working directory.
    pub project_root: PathBuf,

    /// Report directory, relative to `project_root`.
    pub reports_dir: PathBuf,

    /// Host of the system under test.
    pub target_host: String,

    /// Port of the system under test.
    pub target_port: u16,

    /// Default per-command timeout in seconds.
    pub command_timeout_secs: u64,

    /// Timeout for the load-test command in seconds.
    pub performance_timeout_secs: u64,

    /// Simulated users for the load test.
    pub load_users: u32,

    /// Users spawned per second by the load test.
    pub load_spawn_rate: u32,

    /// Load test run time, in the load tool's own syntax (e.g. "60s").
    pub load_run_time: String,

    /// Per-request timeout for probe checks in seconds.
    pub probe_timeout_secs: u64,

    /// Attempts made by `wait_for_target`.
    pub probe_attempts: u32,

    /// Delay between probe attempts in milliseconds.
    pub probe_delay_ms: u64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            reports_dir: PathBuf::from("docs/coverage_report"),
            target_host: "localhost".to_string(),
            target_port: 8000,
            command_timeout_secs: 300,
            performance_timeout_secs: 120,
            load_users: 10,
            load_spawn_rate: 2,
            load_run_time: "60s".to_string(),
            probe_timeout_secs: 30,
            probe_attempts: 10,
            probe_delay_ms: 2_000,
        }
    }
}

impl QaConfig {
    /// Create a configuration rooted at `project_root` with default settings.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Point the suite at a different system under test.
    pub fn with_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.target_host = host.into();
        self.target_port = port;
        self
    }

    /// Override the default per-command timeout.
    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    /// Base URL of the system under test, without a trailing slash.
    pub fn target_base_url(&self) -> String {
        format!("http://{}:{}", self.target_host, self.target_port)
    }

    /// Report directory as seen from the project root (used in command lines).
    pub fn reports_dir_relative(&self) -> &Path {
        &self.reports_dir
    }

    /// Absolute-or-cwd-relative report directory.
    pub fn reports_dir_path(&self) -> PathBuf {
        self.project_root.join(&self.reports_dir)
    }

    /// Location of the persisted suite summary.
    pub fn summary_path(&self) -> PathBuf {
        self.reports_dir_path().join(SUMMARY_FILE_NAME)
    }

    /// Summary location for a run scope. A single-category run gets its own
    /// `qa_<key>_summary.json` so it never overwrites the full-suite report.
    pub fn summary_path_for(&self, scope: Option<Category>) -> PathBuf {
        match scope {
            None => self.summary_path(),
            Some(category) => self
                .reports_dir_path()
                .join(format!("qa_{}_summary.json", category.key())),
        }
    }

    /// Directory holding the load-test artifacts.
    pub fn performance_dir(&self) -> PathBuf {
        self.reports_dir_path().join("performance")
    }

    /// Directory holding the security-run artifacts.
    pub fn security_dir(&self) -> PathBuf {
        self.reports_dir_path().join("security")
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn performance_timeout(&self) -> Duration {
        Duration::from_secs(self.performance_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }

    /// Path to a report artifact, relative to the project root, as a string
    /// suitable for a command-line argument.
    pub(crate) fn report_arg(&self, file: &str) -> String {
        self.reports_dir.join(file).to_string_lossy().into_owned()
    }
}
