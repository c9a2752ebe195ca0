//! Structured tracing events for the suite lifecycle.
//!
//! Every console line the orchestrator emits while running goes through
//! here, so the severity marker comes from the tracing level.

use crate::category::Category;
use crate::result::{CategoryResult, ExecutionResult, SuiteSummary};
use tracing::{error, info, warn};

/// Run-scoped span; instrument the suite future with it so every event
/// carries the run id.
pub fn suite_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("qa.suite", run_id = %run_id)
}

/// Emit event: suite started with the planned category keys.
pub fn emit_suite_started(run_id: &str, categories: &[Category]) {
    let names: Vec<&str> = categories.iter().map(|c| c.key()).collect();
    info!(event = "suite.started", run_id = %run_id, categories = ?names, "Starting QA suite");
}

/// Emit event: a category runner is starting.
pub fn emit_category_started(category: Category) {
    info!(event = "category.started", category = %category, "=== {} ===", category.title());
}

/// Emit event: category finished; logged at error level when it failed.
pub fn emit_category_finished(result: &CategoryResult) {
    if result.passed {
        info!(
            event = "category.finished",
            category = %result.category,
            passed = true,
            "{}: {}/{} checks passed",
            result.category.title(),
            result.success_count(),
            result.results.len()
        );
    } else {
        error!(
            event = "category.finished",
            category = %result.category,
            passed = false,
            "{}: {}/{} checks passed",
            result.category.title(),
            result.success_count(),
            result.results.len()
        );
    }
}

/// Emit event: a runner errored or panicked before it could produce results.
pub fn emit_category_error(category: Category, error: &dyn std::fmt::Display) {
    error!(event = "category.error", category = %category, error = %error, "Error in {}", category.key());
}

/// Emit event: an external command is about to be launched.
pub fn emit_command_started(name: &str, command: &[String]) {
    info!(event = "command.started", name = %name, command = ?command, "Running: {}", name);
}

/// Emit event: command finished, timed out, or failed to launch.
pub fn emit_command_finished(result: &ExecutionResult) {
    if result.success {
        info!(
            event = "command.finished",
            name = %result.name,
            duration_secs = result.duration,
            "{} finished in {:.1}s",
            result.name,
            result.duration
        );
    } else if result.timed_out {
        error!(
            event = "command.timed_out",
            name = %result.name,
            duration_secs = result.duration,
            "{} timed out after {:.0}s",
            result.name,
            result.duration
        );
    } else {
        error!(
            event = "command.failed",
            name = %result.name,
            exit_code = ?result.exit_code,
            duration_secs = result.duration,
            stderr = %result.stderr,
            error = ?result.error,
            "{} failed in {:.1}s",
            result.name,
            result.duration
        );
    }
}

/// Emit event: suite finished with verdict and category counts.
pub fn emit_suite_finished(summary: &SuiteSummary) {
    info!(
        event = "suite.finished",
        run_id = %summary.run_id,
        status = %summary.overall_status,
        passed_categories = summary.passed_categories,
        total_categories = summary.total_categories,
        duration_secs = summary.total_duration,
    );
}

/// Emit event: report write failed; the verdict still stands.
pub fn emit_report_error(error: &dyn std::fmt::Display) {
    warn!(event = "report.write_error", error = %error);
}
