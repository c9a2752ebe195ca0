//! Persisted suite report and the console summary.

use crate::config::QaConfig;
use crate::result::SuiteSummary;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

const RULE: &str = "============================================================";

/// Write any report as pretty JSON, creating parent directories.
pub fn write_json_report<T: Serialize + ?Sized>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Write the suite summary as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &SuiteSummary) -> Result<()> {
    write_json_report(path, summary)
}

/// Read a previously written summary back.
pub fn read_summary_json(path: &Path) -> Result<SuiteSummary> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

/// Render the final console report; `summary_path` is where the summary was written.
pub fn render_console_report(summary: &SuiteSummary, config: &QaConfig, summary_path: &Path) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str("QA SUITE FINAL REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    let marker = if summary.passed() { "✓" } else { "✗" };
    out.push_str(&format!("{} Overall Status: {}\n", marker, summary.overall_status));
    out.push_str(&format!("Total Duration: {:.1}s\n", summary.total_duration));
    out.push_str(&format!("Success Rate: {:.1}%\n", summary.success_rate * 100.0));
    out.push_str(&format!(
        "Passed Categories: {}/{}\n",
        summary.passed_categories, summary.total_categories
    ));

    out.push_str("\nCategory Details:\n");
    for result in &summary.categories {
        let status = if result.passed { "✓" } else { "✗" };
        out.push_str(&format!(
            "  {} {} ({}/{} passed)\n",
            status,
            result.category.title(),
            result.success_count(),
            result.results.len()
        ));
        if let Some(error) = &result.error {
            out.push_str(&format!("      error: {}\n", error));
        }
        for exec in result.results.iter().filter(|r| !r.success) {
            let reason = if exec.timed_out {
                "timed out".to_string()
            } else if let Some(code) = exec.exit_code {
                format!("exit code {}", code)
            } else {
                exec.error.clone().unwrap_or_else(|| "failed".to_string())
            };
            out.push_str(&format!("      - {}: {}\n", exec.name, reason));
        }
    }

    let reports = config.reports_dir_relative().display();
    out.push_str("\nGenerated Reports:\n");
    let summary_shown = summary_path.strip_prefix(&config.project_root).unwrap_or(summary_path);
    out.push_str(&format!("  {}\n", summary_shown.display()));
    out.push_str(&format!("  {}/htmlcov/ (coverage)\n", reports));
    out.push_str(&format!("  {}/*-report.html (reports)\n", reports));
    out.push_str(RULE);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::result::{CategoryResult, ExecutionResult, OverallStatus};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn sample_summary() -> SuiteSummary {
        SuiteSummary::new(
            Uuid::parse_str("11111111-1111-1111-1111-111111111111").expect("valid UUID"),
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("parse RFC3339")
                .with_timezone(&Utc),
            12.5,
            "abc".to_string(),
            vec![
                CategoryResult::from_results(
                    Category::Unit,
                    vec![ExecutionResult::completed(
                        "Unit Tests",
                        vec!["pytest".to_string()],
                        Some(0),
                        "1 passed".to_string(),
                        String::new(),
                        2.0,
                    )],
                ),
                CategoryResult::from_results(
                    Category::Performance,
                    vec![ExecutionResult::timed_out("Performance Tests", vec!["locust".to_string()], 120.0)],
                ),
                CategoryResult::errored(Category::Security, "io error: denied"),
            ],
        )
    }

    #[test]
    fn summary_json_has_expected_keys() {
        let value = serde_json::to_value(sample_summary()).expect("to_value");
        for key in [
            "run_id",
            "timestamp",
            "total_duration",
            "plan_digest",
            "total_categories",
            "passed_categories",
            "success_rate",
            "overall_status",
            "categories",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["overall_status"], "FAILED");
        let perf = &value["categories"]["performance_tests"]["results"][0];
        assert_eq!(perf["timed_out"], true);
        assert_eq!(perf["success"], false);
        assert!(perf["exit_code"].is_null());
        assert_eq!(value["categories"]["unit_tests"]["results"][0]["stdout"], "1 passed");
    }

    #[test]
    fn write_creates_directories_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docs/coverage_report/qa_suite_summary.json");
        let summary = sample_summary();

        write_summary_json(&path, &summary).expect("write");
        let parsed = read_summary_json(&path).expect("read");
        assert_eq!(parsed.run_id, summary.run_id);
        assert_eq!(parsed.timestamp, summary.timestamp);
        assert_eq!(parsed.passed_categories, 1);
        assert_eq!(parsed.overall_status, OverallStatus::Failed);
        let order: Vec<_> = parsed.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, vec![Category::Unit, Category::Performance, Category::Security]);
    }

    #[test]
    fn console_report_lists_every_category() {
        let config = QaConfig::default();
        let report = render_console_report(&sample_summary(), &config, &config.summary_path());
        assert!(report.contains("Overall Status: FAILED"));
        assert!(report.contains("Passed Categories: 1/3"));
        assert!(report.contains("✓ Unit Tests"));
        assert!(report.contains("✗ Performance Tests"));
        assert!(report.contains("Performance Tests: timed out"));
        assert!(report.contains("error: io error: denied"));
        assert!(report.contains("docs/coverage_report/qa_suite_summary.json"));
    }

    #[test]
    fn console_report_points_at_single_category_summary() {
        let config = QaConfig::new("/srv/project");
        let path = config.summary_path_for(Some(Category::Unit));
        let report = render_console_report(&sample_summary(), &config, &path);
        assert!(report.contains("  docs/coverage_report/qa_unit_tests_summary.json\n"));
        assert!(!report.contains("qa_suite_summary.json"));
    }
}
