//! Standalone load-test runner.
//!
//! Runs locust headless against the target with one of four profiles
//! (load, stress, spike, volume), or all of them back to back as a
//! performance suite whose summary lands in
//! `<reports>/performance/performance_suite_summary.json`.

use crate::category::CommandSpec;
use crate::config::QaConfig;
use crate::executor::CommandExecutor;
use crate::obs;
use crate::report::write_json_report;
use crate::result::{BatchSummary, ExecutionResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const PERFORMANCE_SUMMARY_FILE: &str = "performance_suite_summary.json";

/// Pause after a successful suite test, before the next one starts.
const DEFAULT_SUITE_PAUSE: Duration = Duration::from_secs(10);

/// Load shapes with their default parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadProfile {
    /// 10 users, spawn 2/s, 60s
    Load,
    /// 50 users, spawn 5/s, 120s
    Stress,
    /// 100 users, spawn 20/s, 30s
    Spike,
    /// 20 users, spawn 1/s, 300s
    Volume,
}

impl LoadProfile {
    pub const ALL: [LoadProfile; 4] = [
        LoadProfile::Load,
        LoadProfile::Stress,
        LoadProfile::Spike,
        LoadProfile::Volume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LoadProfile::Load => "load",
            LoadProfile::Stress => "stress",
            LoadProfile::Spike => "spike",
            LoadProfile::Volume => "volume",
        }
    }

    pub fn from_name(name: &str) -> Option<LoadProfile> {
        let name = name.to_ascii_lowercase();
        LoadProfile::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The profile's test with its default parameters.
    pub fn test(&self) -> LoadTest {
        match self {
            LoadProfile::Load => LoadTest::new("load_test", 10, 2, "60s"),
            LoadProfile::Stress => LoadTest::new("stress_test", 50, 5, "120s"),
            LoadProfile::Spike => LoadTest::new("spike_test", 100, 20, "30s"),
            LoadProfile::Volume => LoadTest::new("volume_test", 20, 1, "300s"),
        }
    }
}

/// One locust run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadTest {
    /// Report file prefix (e.g. "stress_test").
    pub name: String,
    pub users: u32,
    pub spawn_rate: u32,
    /// Run time in locust syntax ("60s", "2m").
    pub run_time: String,
}

impl LoadTest {
    pub fn new(name: impl Into<String>, users: u32, spawn_rate: u32, run_time: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users,
            spawn_rate,
            run_time: run_time.into(),
        }
    }

    pub fn with_users(mut self, users: u32) -> Self {
        self.users = users;
        self
    }

    pub fn with_spawn_rate(mut self, spawn_rate: u32) -> Self {
        self.spawn_rate = spawn_rate;
        self
    }

    pub fn with_run_time(mut self, run_time: impl Into<String>) -> Self {
        self.run_time = run_time.into();
        self
    }

    /// HTML report path, relative to the project root.
    pub fn html_report(&self, config: &QaConfig) -> String {
        config.report_arg(&format!("performance/{}_report.html", self.name))
    }

    /// CSV prefix; locust appends `_stats.csv`, `_failures.csv` and so on.
    pub fn csv_prefix(&self, config: &QaConfig) -> String {
        config.report_arg(&format!("performance/{}", self.name))
    }

    pub fn command(&self, config: &QaConfig) -> CommandSpec {
        let command = vec![
            "locust".to_string(),
            "-f".to_string(),
            "tests/performance/locustfile.py".to_string(),
            "--headless".to_string(),
            "--users".to_string(),
            self.users.to_string(),
            "--spawn-rate".to_string(),
            self.spawn_rate.to_string(),
            "--run-time".to_string(),
            self.run_time.clone(),
            "--host".to_string(),
            config.target_base_url(),
            "--html".to_string(),
            self.html_report(config),
            "--csv".to_string(),
            self.csv_prefix(config),
            "--user-class".to_string(),
            "LoadTestUser".to_string(),
        ];
        CommandSpec::new(format!("Load Test ({})", self.name), command, config.command_timeout())
    }
}

/// What one load test produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadTestOutcome {
    pub test: LoadTest,
    pub host: String,
    pub success: bool,
    pub html_report: String,
    pub csv_stats: String,
    pub execution: ExecutionResult,
}

/// The four tests of the performance suite, in run order.
pub fn suite_tests() -> Vec<LoadTest> {
    vec![
        LoadTest::new("basic_load", 10, 2, "60s"),
        LoadTest::new("stress_test", 30, 5, "90s"),
        LoadTest::new("spike_test", 50, 20, "30s"),
        LoadTest::new("volume_test", 15, 1, "180s"),
    ]
}

/// Location of the performance suite summary.
pub fn suite_summary_path(config: &QaConfig) -> PathBuf {
    config.performance_dir().join(PERFORMANCE_SUMMARY_FILE)
}

/// Runs load tests through a [`CommandExecutor`].
pub struct LoadTestRunner<'a> {
    config: &'a QaConfig,
    executor: Arc<dyn CommandExecutor>,
    pause: Duration,
}

impl<'a> LoadTestRunner<'a> {
    pub fn new(config: &'a QaConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            executor,
            pause: DEFAULT_SUITE_PAUSE,
        }
    }

    /// Override the pause taken after each successful suite test.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run one load test. Failures are reported in the outcome.
    pub async fn run(&self, test: &LoadTest) -> LoadTestOutcome {
        let host = self.config.target_base_url();
        info!(
            event = "load_test.started",
            test = %test.name,
            users = test.users,
            spawn_rate = test.spawn_rate,
            run_time = %test.run_time,
            host = %host,
            "Starting load test: {}",
            test.name
        );

        if let Err(e) = std::fs::create_dir_all(self.config.performance_dir()) {
            warn!(event = "load_test.reports_dir", error = %e, "Could not create performance report directory");
        }

        let execution = self.executor.execute(&test.command(self.config)).await;
        if execution.success {
            info!(event = "load_test.finished", test = %test.name, success = true, "Load test completed");
        } else {
            error!(
                event = "load_test.finished",
                test = %test.name,
                success = false,
                error = ?execution.error,
                "Load test failed"
            );
        }

        LoadTestOutcome {
            test: test.clone(),
            host,
            success: execution.success,
            html_report: test.html_report(self.config),
            csv_stats: format!("{}_stats.csv", test.csv_prefix(self.config)),
            execution,
        }
    }

    /// Run every suite test in order; a failure does not stop the rest.
    /// The summary is written to `performance_suite_summary.json`.
    pub async fn run_suite(&self) -> BatchSummary<LoadTestOutcome> {
        let tests = suite_tests();
        let mut outcomes = Vec::with_capacity(tests.len());
        for (i, test) in tests.iter().enumerate() {
            let outcome = self.run(test).await;
            let pause = outcome.success && i + 1 < tests.len() && !self.pause.is_zero();
            outcomes.push(outcome);
            if pause {
                tokio::time::sleep(self.pause).await;
            }
        }

        let summary = BatchSummary::new(outcomes, |o| o.success);
        if let Err(e) = write_json_report(&suite_summary_path(self.config), &summary) {
            obs::emit_report_error(&format!("{:#}", e));
        }
        info!(
            event = "load_suite.finished",
            successful = summary.successful_tests,
            total = summary.total_tests,
            "Performance suite: {}/{} tests succeeded",
            summary.successful_tests,
            summary.total_tests
        );
        summary
    }
}
