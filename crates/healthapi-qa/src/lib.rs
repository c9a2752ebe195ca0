//! Health API QA - test-suite orchestration and reporting
//!
//! Provides a sequential QA suite runner that:
//! - Runs seven fixed categories (quality, unit, functional, integration,
//!   contract, performance, security) as external commands with timeouts
//! - Contains every failure at the category boundary and aggregates a verdict
//! - Persists a JSON summary and renders a console report
//! - Probes the target service and drives SonarQube analysis
//! - Runs standalone load-test profiles and security scans

pub mod category;
pub mod config;
pub mod error;
pub mod executor;
pub mod obs;
pub mod perf;
pub mod plan;
pub mod probe;
pub mod report;
pub mod result;
pub mod security;
pub mod sonar;
pub mod suite;
pub mod telemetry;

// Re-export key types
pub use category::{Category, CommandSpec};
pub use config::QaConfig;
pub use error::{QaError, Result};
pub use executor::{CommandExecutor, ProcessExecutor};
pub use perf::{LoadProfile, LoadTest, LoadTestOutcome, LoadTestRunner};
pub use plan::{PlannedCategory, SuitePlan};
pub use probe::{Probe, ProbeClient, ProbeOutcome};
pub use report::{read_summary_json, render_console_report, write_json_report, write_summary_json};
pub use result::{BatchSummary, CategoryResult, ExecutionResult, OverallStatus, SuiteSummary};
pub use security::{ScanReport, SecurityCheck, SecurityTestResult, SecurityTestRunner};
pub use sonar::{QualityGateStatus, SonarConfig, SonarOutcome, SonarRunner};
pub use suite::QaSuite;
pub use telemetry::{init_tracing, LogFormat};
