//! Rule gap validation.
//!
//! A category "has a rule" only when its purchase mode and every field that mode needs
//! are configured. Generation refuses to run while any category holds active products
//! without such a rule.

use crate::core::model::{Category, Product};
use serde::Serialize;
use std::collections::BTreeSet;

/// Mismatches between configured rules and active products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleGaps {
    /// Categories with active products but no complete rule, sorted by id
    pub categories_without_rules: Vec<i64>,
    /// Categories with a complete rule but no active product, sorted by id
    pub categories_without_products: Vec<i64>,
}

impl RuleGaps {
    /// Whether generation may proceed.
    #[must_use]
    pub fn blocks_generation(&self) -> bool {
        !self.categories_without_rules.is_empty()
    }
}

/// Cross-checks categories against active products.
#[must_use]
pub fn collect_rule_gaps(categories: &[Category], active_products: &[Product]) -> RuleGaps {
    let product_categories: BTreeSet<i64> = active_products.iter().map(|p| p.category_id).collect();
    let rule_categories: BTreeSet<i64> = categories
        .iter()
        .filter(|c| c.has_complete_rule())
        .map(|c| c.id)
        .collect();

    RuleGaps {
        categories_without_rules: product_categories
            .difference(&rule_categories)
            .copied()
            .collect(),
        categories_without_products: rule_categories
            .difference(&product_categories)
            .copied()
            .collect(),
    }
}
