//! Result records produced by a suite run.
//!
//! `ExecutionResult` is one command invocation, `CategoryResult` is one
//! category, and `SuiteSummary` is the whole run as persisted to disk.

use crate::category::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one external command invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// Human-readable command name (e.g. "Flake8 Linting").
    pub name: String,

    /// Argument vector that was launched.
    pub command: Vec<String>,

    /// True iff the process exited with code 0.
    pub success: bool,

    /// Wall-clock duration in seconds, capped at the timeout.
    pub duration: f64,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Process exit code; `None` when the process never exited on its own.
    pub exit_code: Option<i32>,

    /// Whether the command was killed after exceeding its timeout.
    pub timed_out: bool,

    /// Launch failure or timeout description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Result for a process that ran to completion.
    pub fn completed(
        name: impl Into<String>,
        command: Vec<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: f64,
    ) -> Self {
        Self {
            name: name.into(),
            command,
            success: exit_code == Some(0),
            duration,
            stdout,
            stderr,
            exit_code,
            timed_out: false,
            error: None,
        }
    }

    /// Result for a process killed at its timeout.
    pub fn timed_out(name: impl Into<String>, command: Vec<String>, timeout_secs: f64) -> Self {
        let name = name.into();
        let error = format!("{} timed out after {}s", name, timeout_secs);
        Self {
            name,
            command,
            success: false,
            duration: timeout_secs,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: true,
            error: Some(error),
        }
    }

    /// Result for a process that could not be started.
    pub fn launch_failed(
        name: impl Into<String>,
        command: Vec<String>,
        error: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            name: name.into(),
            command,
            success: false,
            duration,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryResult {
    pub category: Category,

    /// Sub-command results in execution order.
    pub results: Vec<ExecutionResult>,

    /// True iff every sub-command succeeded and the runner did not error.
    pub passed: bool,

    /// Fraction of sub-commands that succeeded, in [0, 1].
    pub success_rate: f64,

    /// Runner failure that prevented the category from completing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryResult {
    /// Aggregate sub-command results into a category result.
    ///
    /// A category with no sub-commands did not run anything and is failed.
    pub fn from_results(category: Category, results: Vec<ExecutionResult>) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64
        };
        Self {
            category,
            passed: total > 0 && succeeded == total,
            success_rate,
            results,
            error: None,
        }
    }

    /// Failed result for a runner that errored before producing results.
    pub fn errored(category: Category, error: impl Into<String>) -> Self {
        Self {
            category,
            results: Vec::new(),
            passed: false,
            success_rate: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// Final verdict of a suite run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Passed,
    Failed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Passed => "PASSED",
            OverallStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a suite run, persisted as the suite report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteSummary {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,

    /// Total wall-clock duration in seconds.
    pub total_duration: f64,

    /// Digest of the executed plan (category order and command lines).
    pub plan_digest: String,

    pub total_categories: usize,
    pub passed_categories: usize,

    /// `passed_categories / total_categories`, 0 when nothing ran.
    pub success_rate: f64,

    pub overall_status: OverallStatus,

    /// Per-category results, keyed by category name in execution order.
    #[serde(with = "ordered_categories")]
    pub categories: Vec<CategoryResult>,
}

impl SuiteSummary {
    /// Build a summary once every category has been attempted.
    pub fn new(
        run_id: Uuid,
        timestamp: DateTime<Utc>,
        total_duration: f64,
        plan_digest: String,
        categories: Vec<CategoryResult>,
    ) -> Self {
        let total_categories = categories.len();
        let passed_categories = categories.iter().filter(|c| c.passed).count();
        let success_rate = if total_categories == 0 {
            0.0
        } else {
            passed_categories as f64 / total_categories as f64
        };
        let overall_status = if passed_categories == total_categories {
            OverallStatus::Passed
        } else {
            OverallStatus::Failed
        };
        Self {
            run_id,
            timestamp,
            total_duration,
            plan_digest,
            total_categories,
            passed_categories,
            success_rate,
            overall_status,
            categories,
        }
    }

    pub fn passed(&self) -> bool {
        self.overall_status == OverallStatus::Passed
    }

    pub fn category(&self, category: Category) -> Option<&CategoryResult> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Summary of a batch of standalone runs (load profiles, security checks).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary<T> {
    pub timestamp: DateTime<Utc>,
    pub total_tests: usize,
    pub successful_tests: usize,
    pub failed_tests: usize,
    pub results: Vec<T>,
}

impl<T> BatchSummary<T> {
    pub fn new(results: Vec<T>, succeeded: impl Fn(&T) -> bool) -> Self {
        let successful_tests = results.iter().filter(|r| succeeded(r)).count();
        Self {
            timestamp: Utc::now(),
            total_tests: results.len(),
            successful_tests,
            failed_tests: results.len() - successful_tests,
            results,
        }
    }

    /// True iff at least one test ran and none failed.
    pub fn passed(&self) -> bool {
        self.total_tests > 0 && self.failed_tests == 0
    }
}

/// Serializes the category list as a JSON object keyed by category name,
/// preserving execution order in both directions.
mod ordered_categories {
    use super::CategoryResult;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(categories: &[CategoryResult], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for result in categories {
            map.serialize_entry(result.category.key(), result)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<CategoryResult>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vec<CategoryResult>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category name to category result")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_key, value)) = access.next_entry::<String, CategoryResult>()? {
                    out.push(value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(name: &str) -> ExecutionResult {
        ExecutionResult::completed(name, vec![name.to_string()], Some(0), String::new(), String::new(), 0.1)
    }

    fn failed(name: &str) -> ExecutionResult {
        ExecutionResult::completed(
            name,
            vec![name.to_string()],
            Some(1),
            String::new(),
            "boom".to_string(),
            0.1,
        )
    }

    #[test]
    fn test_completed_success_follows_exit_code() {
        assert!(ok("a").success);
        assert!(!failed("b").success);
        let killed = ExecutionResult::completed("c", vec![], None, String::new(), String::new(), 0.0);
        assert!(!killed.success);
    }

    #[test]
    fn test_timed_out_caps_duration() {
        let result = ExecutionResult::timed_out("Performance Tests", vec!["locust".into()], 120.0);
        assert!(!result.success);
        assert!(result.timed_out);
        assert_eq!(result.duration, 120.0);
        assert_eq!(result.exit_code, None);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[test]
    fn test_quality_success_rate() {
        let results = vec![ok("a"), ok("b"), failed("c"), ok("d"), ok("e"), failed("f")];
        let category = CategoryResult::from_results(Category::Quality, results);
        assert_eq!(category.success_count(), 4);
        assert!((category.success_rate - 4.0 / 6.0).abs() < f64::EPSILON);
        assert!(!category.passed);
    }

    #[test]
    fn test_all_passed_category() {
        let category = CategoryResult::from_results(Category::Unit, vec![ok("unit")]);
        assert!(category.passed);
        assert_eq!(category.success_rate, 1.0);
    }

    #[test]
    fn test_empty_category_is_not_passed() {
        let category = CategoryResult::from_results(Category::Unit, vec![]);
        assert!(!category.passed);
        assert_eq!(category.success_rate, 0.0);
    }

    #[test]
    fn test_errored_category() {
        let category = CategoryResult::errored(Category::Unit, "disk full");
        assert!(!category.passed);
        assert!(category.results.is_empty());
        assert_eq!(category.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_overall_status_requires_every_category() {
        let summary = SuiteSummary::new(
            Uuid::new_v4(),
            Utc::now(),
            1.0,
            "digest".to_string(),
            vec![
                CategoryResult::from_results(Category::Unit, vec![ok("unit")]),
                CategoryResult::from_results(Category::Security, vec![failed("security")]),
            ],
        );
        assert_eq!(summary.overall_status, OverallStatus::Failed);
        assert_eq!(summary.passed_categories, 1);
        assert_eq!(summary.total_categories, 2);
        assert_eq!(summary.success_rate, 0.5);
    }

    #[test]
    fn test_batch_summary_counts() {
        let batch = BatchSummary::new(vec![ok("load"), failed("spike"), ok("volume")], |r| r.success);
        assert_eq!(batch.total_tests, 3);
        assert_eq!(batch.successful_tests, 2);
        assert_eq!(batch.failed_tests, 1);
        assert!(!batch.passed());

        let empty: BatchSummary<ExecutionResult> = BatchSummary::new(vec![], |r| r.success);
        assert!(!empty.passed());
    }

    #[test]
    fn test_empty_summary_rate_is_zero() {
        let summary = SuiteSummary::new(Uuid::new_v4(), Utc::now(), 0.0, String::new(), vec![]);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_categories_serialize_as_ordered_map() {
        let summary = SuiteSummary::new(
            Uuid::new_v4(),
            Utc::now(),
            1.0,
            "digest".to_string(),
            vec![
                CategoryResult::from_results(Category::Security, vec![ok("security")]),
                CategoryResult::from_results(Category::Quality, vec![ok("black")]),
            ],
        );
        let json = serde_json::to_string(&summary).expect("serialize");
        let security = json.find("\"security_tests\"").expect("security key");
        let quality = json.find("\"code_quality\"").expect("quality key");
        assert!(security < quality, "execution order must be preserved");
        assert!(json.contains("\"overall_status\":\"PASSED\""));

        let parsed: SuiteSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.categories[0].category, Category::Security);
        assert_eq!(parsed.categories[1].category, Category::Quality);
    }
}
