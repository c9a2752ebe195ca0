//! Suite plan: which categories run, in which order, with which commands.

use crate::category::{Category, CommandSpec};
use crate::config::QaConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Planned category with its resolved command lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedCategory {
    pub category: Category,
    pub commands: Vec<CommandSpec>,
}

/// Ordered execution plan for one suite run.
///
/// The digest identifies the plan independently of when it ran, so two
/// reports with the same digest exercised the same command lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuitePlan {
    pub categories: Vec<PlannedCategory>,
    pub digest: String,
}

impl SuitePlan {
    /// Plan for the full suite, in the fixed declared order.
    pub fn full(config: &QaConfig) -> Self {
        Self::for_categories(&Category::ALL, config)
    }

    /// Plan for exactly one category.
    pub fn single(category: Category, config: &QaConfig) -> Self {
        Self::for_categories(&[category], config)
    }

    fn for_categories(categories: &[Category], config: &QaConfig) -> Self {
        let categories: Vec<PlannedCategory> = categories
            .iter()
            .map(|&category| PlannedCategory {
                category,
                commands: category.commands(config),
            })
            .collect();
        let digest = compute_plan_digest(&categories);
        Self { categories, digest }
    }

    pub fn category_list(&self) -> Vec<Category> {
        self.categories.iter().map(|p| p.category).collect()
    }
}

/// Deterministic digest of ordered category keys and their argument vectors.
fn compute_plan_digest(categories: &[PlannedCategory]) -> String {
    let mut hasher = Sha256::new();
    for planned in categories {
        hasher.update(planned.category.key().as_bytes());
        hasher.update(b"\0");
        for command in &planned.commands {
            for arg in &command.command {
                hasher.update(arg.as_bytes());
                hasher.update(b"\x1f");
            }
            hasher.update(b"\x1e");
        }
    }
    hex::encode(hasher.finalize())
}
