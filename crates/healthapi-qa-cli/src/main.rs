//! Health API QA Suite CLI
//!
//! The `qa-suite` command drives the QA categories against a project.
//!
//! ## Commands
//!
//! - `run`: run the full suite, or one category with `--category`
//! - `probe`: check the health, readiness and liveness probes of the target
//! - `sonar`: run a SonarQube analysis and report the quality gate
//! - `perf`: run one load-test profile, or the whole performance suite
//! - `security`: run the basic security scan, the OWASP tests, or both

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use healthapi_qa::{
    init_tracing, render_console_report, write_summary_json, Category, LoadProfile,
    LoadTestOutcome, LoadTestRunner, LogFormat, ProbeClient, ProcessExecutor, QaConfig, QaSuite,
    SecurityTestResult, SecurityTestRunner, SonarConfig, SonarRunner, SuiteSummary,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{warn, Level};

#[derive(Parser)]
#[command(name = "qa-suite")]
#[command(author = "QA Engineering Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Health API QA Suite Runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Project root; commands run from here and reports land under it
    #[arg(long, global = true, env = "QA_PROJECT_ROOT", default_value = ".")]
    project_root: PathBuf,

    /// Host of the system under test
    #[arg(long, global = true, env = "HEALTHAPI_HOST", default_value = "localhost")]
    host: String,

    /// Port of the system under test
    #[arg(long, global = true, env = "HEALTHAPI_PORT", default_value_t = 8000)]
    port: u16,

    /// Per-command timeout in seconds
    #[arg(long, global = true, env = "QA_COMMAND_TIMEOUT_SECS", default_value_t = 300)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the QA suite
    Run {
        /// Run only this category (e.g. unit_tests, unit, code_quality)
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,

        /// Wait for the target's health probe before running
        #[arg(long)]
        check_target: bool,
    },

    /// Check the target's probe endpoints
    Probe {
        /// Retry the health probe until the target comes up
        #[arg(long)]
        wait: bool,
    },

    /// Run a SonarQube analysis
    Sonar {
        /// SonarQube server URL
        #[arg(long = "sonar-host", env = "SONAR_HOST_URL", default_value = healthapi_qa::sonar::DEFAULT_SONAR_HOST)]
        sonar_host: String,

        /// SonarQube authentication token
        #[arg(long, env = "SONAR_TOKEN")]
        token: Option<String>,

        /// Skip the test-with-coverage step
        #[arg(long)]
        skip_tests: bool,
    },

    /// Run load tests with locust
    Perf {
        /// Load profile, or `suite` for all four in sequence
        #[arg(long, value_enum, default_value_t = PerfMode::Load)]
        profile: PerfMode,

        /// Override the profile's simulated users
        #[arg(long)]
        users: Option<u32>,

        /// Override the profile's spawn rate (users per second)
        #[arg(long)]
        spawn_rate: Option<u32>,

        /// Override the profile's run time (e.g. 90s, 2m)
        #[arg(long)]
        duration: Option<String>,
    },

    /// Run security tests
    Security {
        #[arg(long, value_enum, default_value_t = SecurityMode::Suite)]
        mode: SecurityMode,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PerfMode {
    Load,
    Stress,
    Spike,
    Volume,
    Suite,
}

impl PerfMode {
    fn profile(self) -> Option<LoadProfile> {
        match self {
            PerfMode::Load => Some(LoadProfile::Load),
            PerfMode::Stress => Some(LoadProfile::Stress),
            PerfMode::Spike => Some(LoadProfile::Spike),
            PerfMode::Volume => Some(LoadProfile::Volume),
            PerfMode::Suite => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SecurityMode {
    Owasp,
    Basic,
    Suite,
}

/// Accept canonical report keys and short names.
fn parse_category(value: &str) -> std::result::Result<Category, String> {
    Category::from_name(value).ok_or_else(|| {
        let valid: Vec<&str> = Category::ALL.iter().map(|c| c.key()).collect();
        format!("unknown category '{}' (valid: {})", value, valid.join(", "))
    })
}

impl Cli {
    fn config(&self) -> QaConfig {
        QaConfig::new(&self.project_root)
            .with_target(&self.host, self.port)
            .with_command_timeout(self.timeout)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(LogFormat::from_json_flag(cli.json), level);

    let config = cli.config();

    match cli.command {
        Commands::Run {
            category,
            check_target,
        } => cmd_run(&config, category, check_target).await,
        Commands::Probe { wait } => cmd_probe(&config, wait).await,
        Commands::Sonar {
            sonar_host,
            token,
            skip_tests,
        } => {
            let sonar = SonarConfig {
                host: sonar_host,
                token,
                skip_tests,
                ..SonarConfig::default()
            };
            cmd_sonar(&config, sonar).await
        }
        Commands::Perf {
            profile,
            users,
            spawn_rate,
            duration,
        } => cmd_perf(&config, profile, users, spawn_rate, duration).await,
        Commands::Security { mode } => cmd_security(&config, mode).await,
    }
}

/// Run the suite (or one category), persist the report and print the summary.
async fn cmd_run(config: &QaConfig, category: Option<Category>, check_target: bool) -> Result<()> {
    if check_target {
        let outcome = healthapi_qa::probe::wait_for_target(config)
            .await
            .context("Failed to build probe client")?;
        if !outcome.healthy {
            warn!(url = %outcome.url, "Target is not healthy; running categories anyway");
        }
    }

    let summary = run_suite(config, category).await;

    // a single category persists to its own file; the full-suite report stays intact
    let report_path = config.summary_path_for(category);
    if let Err(e) = write_summary_json(&report_path, &summary) {
        healthapi_qa::obs::emit_report_error(&format!("{:#}", e));
    }

    print!("{}", render_console_report(&summary, config, &report_path));

    if summary.passed() {
        Ok(())
    } else {
        anyhow::bail!("QA suite failed")
    }
}

async fn run_suite(config: &QaConfig, category: Option<Category>) -> SuiteSummary {
    let executor = Arc::new(ProcessExecutor::new(&config.project_root));
    let suite = QaSuite::new(config, executor);
    match category {
        Some(category) => suite.run_single(category).await,
        None => suite.run_full().await,
    }
}

/// Check every probe once, or wait for the health probe first.
async fn cmd_probe(config: &QaConfig, wait: bool) -> Result<()> {
    let client = ProbeClient::new(config).context("Failed to build probe client")?;

    if wait {
        client
            .wait_for_target(config.probe_attempts, config.probe_delay())
            .await;
    }

    let outcomes = client.check_all().await;
    println!("Target: {}", client.base_url());
    for outcome in &outcomes {
        let status = if outcome.healthy { "✓" } else { "✗" };
        let detail = match (&outcome.status, &outcome.error) {
            (Some(status), None) => status.clone(),
            (_, Some(error)) => error.clone(),
            (None, None) => "no status".to_string(),
        };
        println!("  {} {} ({})", status, outcome.probe.path(), detail);
    }

    if outcomes.iter().all(|o| o.healthy) {
        Ok(())
    } else {
        anyhow::bail!("Target probes failed")
    }
}

async fn cmd_sonar(config: &QaConfig, sonar: SonarConfig) -> Result<()> {
    let executor = Arc::new(ProcessExecutor::new(&config.project_root));
    let runner = SonarRunner::new(sonar, config, executor).context("Failed to build SonarQube client")?;

    let outcome = runner.run_full_analysis().await;

    println!("SonarQube analysis");
    println!("  Server: {}", if outcome.server_up { "✓ UP" } else { "✗ unavailable" });
    if let Some(tests) = outcome.tests_passed {
        println!("  Tests: {}", if tests { "✓ passed" } else { "✗ failed" });
    }
    if let Some(scanner) = &outcome.scanner {
        println!("  Scanner: {}", if scanner.success { "✓ succeeded" } else { "✗ failed" });
    }
    match &outcome.quality_gate {
        Some(Ok(gate)) => {
            println!("  Quality Gate: {}", gate.status);
            for condition in gate.failing_conditions() {
                println!(
                    "    ✗ {}: {} (threshold: {})",
                    condition.metric_key,
                    condition.actual_value.as_deref().unwrap_or("?"),
                    condition.error_threshold.as_deref().unwrap_or("?")
                );
            }
        }
        Some(Err(e)) => println!("  Quality Gate: unavailable ({})", e),
        None => {}
    }
    println!("  Dashboard: {}", outcome.dashboard_url);

    if outcome.success() {
        Ok(())
    } else {
        anyhow::bail!("SonarQube analysis failed")
    }
}

/// Run one load profile (with overrides) or the performance suite.
async fn cmd_perf(
    config: &QaConfig,
    mode: PerfMode,
    users: Option<u32>,
    spawn_rate: Option<u32>,
    duration: Option<String>,
) -> Result<()> {
    let executor = Arc::new(ProcessExecutor::new(&config.project_root));
    let runner = LoadTestRunner::new(config, executor);

    let Some(profile) = mode.profile() else {
        let summary = runner.run_suite().await;
        println!("Performance suite");
        for outcome in &summary.results {
            print_load_outcome(outcome);
        }
        println!(
            "  {}/{} tests succeeded",
            summary.successful_tests, summary.total_tests
        );
        println!("  Summary: {}", healthapi_qa::perf::suite_summary_path(config).display());
        return if summary.passed() {
            Ok(())
        } else {
            anyhow::bail!("Performance suite failed")
        };
    };

    let mut test = profile.test();
    if let Some(users) = users {
        test = test.with_users(users);
    }
    if let Some(rate) = spawn_rate {
        test = test.with_spawn_rate(rate);
    }
    if let Some(duration) = duration {
        test = test.with_run_time(duration);
    }

    let outcome = runner.run(&test).await;
    print_load_outcome(&outcome);
    if outcome.success {
        Ok(())
    } else {
        anyhow::bail!("Load test {} failed", test.name)
    }
}

fn print_load_outcome(outcome: &LoadTestOutcome) {
    let mark = if outcome.success { "✓" } else { "✗" };
    println!(
        "  {} {} ({} users, {}/s, {}) against {}",
        mark,
        outcome.test.name,
        outcome.test.users,
        outcome.test.spawn_rate,
        outcome.test.run_time,
        outcome.host
    );
    println!("      HTML: {}", outcome.html_report);
    println!("      CSV:  {}", outcome.csv_stats);
}

/// Run the basic scan, the OWASP tests, or both as a suite.
async fn cmd_security(config: &QaConfig, mode: SecurityMode) -> Result<()> {
    let executor = Arc::new(ProcessExecutor::new(&config.project_root));
    let runner = SecurityTestRunner::new(config, executor).context("Failed to build security client")?;

    println!("Security tests against {}", runner.base_url());
    let results = match mode {
        SecurityMode::Basic => vec![SecurityTestResult::BasicScan(runner.run_basic_scan().await)],
        SecurityMode::Owasp => vec![SecurityTestResult::Owasp(runner.run_owasp().await)],
        SecurityMode::Suite => runner.run_suite().await.results,
    };

    for result in &results {
        print_security_result(result);
    }
    if mode == SecurityMode::Suite {
        println!("  Summary: {}", healthapi_qa::security::suite_summary_path(config).display());
    }

    if results.iter().all(SecurityTestResult::success) {
        Ok(())
    } else {
        anyhow::bail!("Security tests failed")
    }
}

fn print_security_result(result: &SecurityTestResult) {
    let mark = if result.success() { "✓" } else { "✗" };
    println!("  {} {}", mark, result.title());
    match result {
        SecurityTestResult::BasicScan(scan) => {
            if let Some(report) = &scan.report {
                for check in &report.checks {
                    let mark = if check.passed { "✓" } else { "⚠" };
                    println!("      {} {}: {}", mark, check.name, check.message);
                }
            }
            if let Some(file) = &scan.report_file {
                println!("      Report: {}", file);
            }
            if let Some(error) = &scan.error {
                println!("      {}", error);
            }
        }
        SecurityTestResult::Owasp(owasp) => {
            if let Some(line) = &owasp.summary_line {
                println!("      {}", line);
            }
            if owasp.execution.is_some() {
                println!("      HTML: {}", owasp.html_report);
            }
            if let Some(error) = &owasp.error {
                println!("      {}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_accepts_both_spellings() {
        assert_eq!(parse_category("unit_tests"), Ok(Category::Unit));
        assert_eq!(parse_category("performance"), Ok(Category::Performance));
    }

    #[test]
    fn test_parse_category_rejects_unknown() {
        let err = parse_category("smoke").unwrap_err();
        assert!(err.contains("unknown category 'smoke'"));
        assert!(err.contains("code_quality"));
    }

    #[test]
    fn test_cli_builds_config() {
        let cli = Cli::parse_from([
            "qa-suite",
            "--project-root",
            "/srv/app",
            "--host",
            "sut",
            "--port",
            "9000",
            "--timeout",
            "60",
            "run",
            "--category=unit_tests",
        ]);
        let config = cli.config();
        assert_eq!(config.project_root, PathBuf::from("/srv/app"));
        assert_eq!(config.target_base_url(), "http://sut:9000");
        assert_eq!(config.command_timeout_secs, 60);
        match cli.command {
            Commands::Run { category, .. } => assert_eq!(category, Some(Category::Unit)),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_without_category_is_full_suite() {
        let cli = Cli::parse_from(["qa-suite", "run"]);
        match cli.command {
            Commands::Run { category, check_target } => {
                assert!(category.is_none());
                assert!(!check_target);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_unknown_category_is_usage_error() {
        let err = Cli::try_parse_from(["qa-suite", "run", "--category", "smoke"])
            .err()
            .expect("parse should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_sonar_flags() {
        let cli = Cli::parse_from([
            "qa-suite",
            "sonar",
            "--sonar-host",
            "http://sonar.internal:9000",
            "--token",
            "squ_abc",
            "--skip-tests",
        ]);
        match cli.command {
            Commands::Sonar { sonar_host, token, skip_tests } => {
                assert_eq!(sonar_host, "http://sonar.internal:9000");
                assert_eq!(token.as_deref(), Some("squ_abc"));
                assert!(skip_tests);
            }
            _ => panic!("expected sonar"),
        }
    }

    #[test]
    fn test_perf_overrides() {
        let cli = Cli::parse_from([
            "qa-suite", "perf", "--profile", "stress", "--users", "30", "--duration", "90s",
        ]);
        match cli.command {
            Commands::Perf { profile, users, spawn_rate, duration } => {
                assert_eq!(profile.profile(), Some(LoadProfile::Stress));
                assert_eq!(users, Some(30));
                assert_eq!(spawn_rate, None);
                assert_eq!(duration.as_deref(), Some("90s"));
            }
            _ => panic!("expected perf"),
        }
    }

    #[test]
    fn test_perf_suite_has_no_single_profile() {
        let cli = Cli::parse_from(["qa-suite", "perf", "--profile", "suite"]);
        match cli.command {
            Commands::Perf { profile, .. } => assert_eq!(profile.profile(), None),
            _ => panic!("expected perf"),
        }
    }

    #[test]
    fn test_security_defaults_to_suite() {
        let cli = Cli::parse_from(["qa-suite", "security"]);
        match cli.command {
            Commands::Security { mode } => assert_eq!(mode, SecurityMode::Suite),
            _ => panic!("expected security"),
        }
    }
}
