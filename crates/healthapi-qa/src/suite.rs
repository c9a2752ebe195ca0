//! Category runners and the sequential suite aggregator.

use crate::category::Category;
use crate::config::QaConfig;
use crate::error::{QaError, Result};
use crate::executor::CommandExecutor;
use crate::obs;
use crate::plan::{PlannedCategory, SuitePlan};
use crate::result::{CategoryResult, SuiteSummary};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Placeholder written when the unit test directory has no tests yet.
const BASIC_UNIT_TEST: &str = "\n# Basic unit test\ndef test_basic():\n    assert True\n";

/// Runs QA categories strictly one after another.
pub struct QaSuite<'a> {
    config: &'a QaConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl<'a> QaSuite<'a> {
    pub fn new(config: &'a QaConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }

    /// Run all seven categories in their declared order.
    pub async fn run_full(&self) -> SuiteSummary {
        self.run_plan(&SuitePlan::full(self.config)).await
    }

    /// Run one category; the summary contains only that category.
    pub async fn run_single(&self, category: Category) -> SuiteSummary {
        self.run_plan(&SuitePlan::single(category, self.config)).await
    }

    /// Attempt every planned category, then aggregate.
    ///
    /// A runner error or panic becomes a failed `CategoryResult` carrying the
    /// error text; later categories still run.
    pub async fn run_plan(&self, plan: &SuitePlan) -> SuiteSummary {
        let run_id = Uuid::new_v4();
        let span = obs::suite_span(&run_id.to_string());
        self.run_plan_with_id(plan, run_id).instrument(span).await
    }

    async fn run_plan_with_id(&self, plan: &SuitePlan, run_id: Uuid) -> SuiteSummary {
        let start = Instant::now();
        obs::emit_suite_started(&run_id.to_string(), &plan.category_list());

        let mut results = Vec::with_capacity(plan.categories.len());
        for planned in &plan.categories {
            obs::emit_category_started(planned.category);
            let outcome = AssertUnwindSafe(self.run_category(planned)).catch_unwind().await;
            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    obs::emit_category_error(planned.category, &e);
                    CategoryResult::errored(planned.category, e.to_string())
                }
                Err(payload) => {
                    let message = format!("runner panicked: {}", panic_message(payload.as_ref()));
                    obs::emit_category_error(planned.category, &message);
                    CategoryResult::errored(planned.category, message)
                }
            };
            obs::emit_category_finished(&result);
            results.push(result);
        }

        let summary = SuiteSummary::new(
            run_id,
            Utc::now(),
            start.elapsed().as_secs_f64(),
            plan.digest.clone(),
            results,
        );
        obs::emit_suite_finished(&summary);
        summary
    }

    /// Category runner: prepare fixtures, then invoke each sub-command once.
    pub async fn run_category(&self, planned: &PlannedCategory) -> Result<CategoryResult> {
        prepare_category(planned.category, self.config)?;

        let mut results = Vec::with_capacity(planned.commands.len());
        for spec in &planned.commands {
            if spec.command.is_empty() {
                return Err(QaError::EmptyCommand {
                    name: spec.name.clone(),
                });
            }
            results.push(self.executor.execute(spec).await);
        }

        Ok(CategoryResult::from_results(planned.category, results))
    }
}

/// Text of a panic payload raised with a literal or formatted message.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Per-category setup that must happen before its commands run.
fn prepare_category(category: Category, config: &QaConfig) -> Result<()> {
    match category {
        Category::Unit => ensure_unit_tests(config).map_err(|e| QaError::Preparation {
            category: category.key().to_string(),
            reason: e.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Create `tests/unit/` and seed it with a trivial test if it has none,
/// so the unit run always has something to collect.
fn ensure_unit_tests(config: &QaConfig) -> std::io::Result<()> {
    let dir = config.project_root.join("tests").join("unit");
    std::fs::create_dir_all(&dir)?;

    let has_tests = std::fs::read_dir(&dir)?.filter_map(|e| e.ok()).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        name.starts_with("test_") && name.ends_with(".py")
    });

    if !has_tests {
        std::fs::write(dir.join("test_basic.py"), BASIC_UNIT_TEST)?;
    }
    Ok(())
}
