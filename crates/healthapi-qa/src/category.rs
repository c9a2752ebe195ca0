//! Test categories and the command lines each one runs.

use crate::config::QaConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// QA categories, in the order the full suite runs them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// black, isort, flake8, pylint, bandit, safety
    #[serde(rename = "code_quality")]
    Quality,

    /// pytest tests/unit/ with coverage
    #[serde(rename = "unit_tests")]
    Unit,

    /// pytest tests/functional/
    #[serde(rename = "functional_tests")]
    Functional,

    /// pytest tests/integration/
    #[serde(rename = "integration_tests")]
    Integration,

    /// pytest tests/contracts/
    #[serde(rename = "contract_tests")]
    Contract,

    /// locust, headless
    #[serde(rename = "performance_tests")]
    Performance,

    /// pytest tests/security/ -m security
    #[serde(rename = "security_tests")]
    Security,
}

impl Category {
    /// Fixed execution order of the full suite.
    pub const ALL: [Category; 7] = [
        Category::Quality,
        Category::Unit,
        Category::Functional,
        Category::Integration,
        Category::Contract,
        Category::Performance,
        Category::Security,
    ];

    /// Report key, also accepted on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Quality => "code_quality",
            Category::Unit => "unit_tests",
            Category::Functional => "functional_tests",
            Category::Integration => "integration_tests",
            Category::Contract => "contract_tests",
            Category::Performance => "performance_tests",
            Category::Security => "security_tests",
        }
    }

    /// Short selector name.
    pub fn short_name(&self) -> &'static str {
        match self {
            Category::Quality => "quality",
            Category::Unit => "unit",
            Category::Functional => "functional",
            Category::Integration => "integration",
            Category::Contract => "contract",
            Category::Performance => "performance",
            Category::Security => "security",
        }
    }

    /// Display title used in console output.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Quality => "Code Quality",
            Category::Unit => "Unit Tests",
            Category::Functional => "Functional Tests",
            Category::Integration => "Integration Tests",
            Category::Contract => "Contract Tests",
            Category::Performance => "Performance Tests",
            Category::Security => "Security Tests",
        }
    }

    /// Resolve a category from either its report key or its short name.
    pub fn from_name(name: &str) -> Option<Category> {
        let name = name.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key() == name || c.short_name() == name)
    }

    /// Build the sub-commands this category runs, in order.
    pub fn commands(&self, config: &QaConfig) -> Vec<CommandSpec> {
        let timeout = config.command_timeout();
        match self {
            Category::Quality => quality_checks()
                .into_iter()
                .map(|(name, argv)| CommandSpec::new(name, argv, timeout))
                .collect(),
            Category::Unit => vec![CommandSpec::new(
                self.title(),
                args(&["pytest", "tests/unit/", "--cov=api"])
                    .into_iter()
                    .chain([
                        format!("--cov-report=html:{}", config.report_arg("htmlcov")),
                        format!("--cov-report=xml:{}", config.report_arg("coverage.xml")),
                        "--cov-report=term-missing".to_string(),
                        format!("--junit-xml={}", config.report_arg("unit-tests.xml")),
                        "-v".to_string(),
                    ])
                    .collect(),
                timeout,
            )],
            Category::Functional => vec![pytest_html(self.title(), "functional", "functional", config, &[])],
            Category::Integration => vec![pytest_html(self.title(), "integration", "integration", config, &[])],
            Category::Contract => vec![pytest_html(self.title(), "contracts", "contracts", config, &[])],
            Category::Performance => vec![CommandSpec::new(
                self.title(),
                vec![
                    "locust".to_string(),
                    "-f".to_string(),
                    "tests/performance/locustfile.py".to_string(),
                    "--headless".to_string(),
                    "--users".to_string(),
                    config.load_users.to_string(),
                    "--spawn-rate".to_string(),
                    config.load_spawn_rate.to_string(),
                    "--run-time".to_string(),
                    config.load_run_time.clone(),
                    "--host".to_string(),
                    config.target_base_url(),
                    "--html".to_string(),
                    config.report_arg("performance-report.html"),
                ],
                config.performance_timeout(),
            )],
            Category::Security => vec![pytest_html(
                self.title(),
                "security",
                "security",
                config,
                &["-m", "security"],
            )],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = crate::error::QaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_name(s).ok_or_else(|| crate::error::QaError::UnknownCategory(s.to_string()))
    }
}

/// One external command invocation within a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSpec {
    /// Human-readable name.
    pub name: String,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    /// Timeout in seconds.
    pub timeout_secs: u64,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, command: Vec<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            command,
            timeout_secs: timeout.as_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn quality_checks() -> Vec<(&'static str, Vec<String>)> {
    vec![
        ("Black Code Formatting", args(&["black", "--check", "api/", "tests/"])),
        ("Import Sorting", args(&["isort", "--check-only", "api/", "tests/"])),
        ("Flake8 Linting", args(&["flake8", "api/", "tests/"])),
        ("Pylint Analysis", args(&["pylint", "api/", "tests/", "--fail-under=8.0"])),
        ("Security Analysis", args(&["bandit", "-r", "api/"])),
        ("Dependency Security", args(&["safety", "check"])),
    ]
}

/// pytest over `tests/<dir>/` with self-contained HTML and JUnit reports.
fn pytest_html(
    name: &str,
    dir: &str,
    report: &str,
    config: &QaConfig,
    extra: &[&str],
) -> CommandSpec {
    let mut command = vec![
        "pytest".to_string(),
        format!("tests/{}/", dir),
        format!("--html={}", config.report_arg(&format!("{}-report.html", report))),
        "--self-contained-html".to_string(),
        format!("--junit-xml={}", config.report_arg(&format!("{}-tests.xml", report))),
        "-v".to_string(),
    ];
    command.extend(extra.iter().map(|a| a.to_string()));
    CommandSpec::new(name, command, config.command_timeout())
}
