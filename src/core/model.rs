//! Typed domain records used by the planning algorithm.
//!
//! These are decoupled from the database entities: purchase rules are a tagged variant
//! whose constructors enforce their invariants, and line items come in a mutable working
//! form (with quantity bounds) and an immutable output form.

use crate::{
    core::numeric::{MONEY_PRECISION, round_to},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Min/max number of products to pick per occurrence of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// Lower bound (0 is treated as 1 when drawing)
    pub min: u32,
    /// Upper bound, at least 1
    pub max: u32,
}

impl CountRange {
    /// Creates a count range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRule`] when `min > max` or `max` is 0.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidRule {
                message: format!("items count min {min} exceeds max {max}"),
            });
        }
        if max < 1 {
            return Err(Error::InvalidRule {
                message: "items count max must be at least 1".to_string(),
            });
        }
        Ok(Self { min, max })
    }
}

/// How a category is purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PurchaseMode {
    /// No complete rule configured
    Unset,
    /// A fresh subset is bought every workday
    Daily {
        /// Products per workday
        items: CountRange,
    },
    /// Products are bought every `cycle_days` ± `float_days`
    Periodic {
        /// Products per occurrence
        items: CountRange,
        /// Nominal interval between purchases
        cycle_days: u32,
        /// Allowed jitter either side of the interval
        float_days: u32,
    },
}

impl PurchaseMode {
    /// Daily purchasing rule.
    #[must_use]
    pub const fn daily(items: CountRange) -> Self {
        Self::Daily { items }
    }

    /// Periodic purchasing rule.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRule`] when `cycle_days` is 0.
    pub fn periodic(items: CountRange, cycle_days: u32, float_days: u32) -> Result<Self> {
        if cycle_days == 0 {
            return Err(Error::InvalidRule {
                message: "cycle_days must be positive".to_string(),
            });
        }
        Ok(Self::Periodic {
            items,
            cycle_days,
            float_days,
        })
    }

    /// Item-count range when a rule is configured.
    #[must_use]
    pub const fn items(&self) -> Option<CountRange> {
        match self {
            Self::Unset => None,
            Self::Daily { items } | Self::Periodic { items, .. } => Some(*items),
        }
    }

    /// Storage label of the mode (`None` when unset).
    #[must_use]
    pub const fn label(&self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Daily { .. } => Some("daily"),
            Self::Periodic { .. } => Some("periodic"),
        }
    }
}

/// A product category with its purchasing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Inactive categories take no part in generation
    pub is_active: bool,
    /// Purchasing rule
    pub mode: PurchaseMode,
}

impl Category {
    /// Whether every field its mode needs is configured.
    #[must_use]
    pub const fn has_complete_rule(&self) -> bool {
        !matches!(self.mode, PurchaseMode::Unset)
    }
}

/// Allowed purchase quantity for a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRange {
    /// Smallest quantity
    pub min: Decimal,
    /// Largest quantity
    pub max: Decimal,
}

impl QuantityRange {
    /// Creates a quantity range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAmount`] when `min` is negative or above `max`.
    pub fn new(min: Decimal, max: Decimal) -> Result<Self> {
        if min.is_sign_negative() && !min.is_zero() {
            return Err(Error::InvalidAmount { amount: min });
        }
        if min > max {
            return Err(Error::InvalidAmount { amount: max });
        }
        Ok(Self { min, max })
    }
}

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Identifier
    pub id: i64,
    /// Name, unique among active products
    pub name: String,
    /// Owning category
    pub category_id: i64,
    /// Category name at the time the product was saved
    pub category_name: String,
    /// Canonical unit label
    pub unit: String,
    /// Reference unit price
    pub base_price: Decimal,
    /// Fraction in `[0, 1]` the price may drift either way
    pub volatility: Option<Decimal>,
    /// Per-item quantity bounds
    pub quantity_range: Option<QuantityRange>,
}

/// Acceptable daily spend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRange {
    /// Lower bound
    pub min: Decimal,
    /// Upper bound
    pub max: Decimal,
}

impl BudgetRange {
    /// Creates a validated budget range.
    ///
    /// # Errors
    /// Returns [`Error::BudgetRangeInvalid`] when `min > max`.
    pub fn new(min: Decimal, max: Decimal) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Re-checks the ordering invariant on a range read from storage.
    ///
    /// # Errors
    /// Returns [`Error::BudgetRangeInvalid`] when `min > max`.
    pub fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(Error::BudgetRangeInvalid {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// A line item while a day is being assembled. Carries its quantity bounds so the
/// reconciler can move it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingItem {
    /// Source product
    pub product_id: i64,
    /// Category snapshot
    pub category_id: i64,
    /// Category name snapshot
    pub category_name: String,
    /// Product name
    pub name: String,
    /// Unit label
    pub unit: String,
    /// Realized unit price
    pub price: Decimal,
    /// Realized quantity
    pub quantity: Decimal,
    /// `price * quantity`, rounded
    pub amount: Decimal,
    /// Lowest allowed quantity
    pub qty_min: Decimal,
    /// Highest allowed quantity
    pub qty_max: Decimal,
    /// Quantity granularity
    pub qty_step: Decimal,
}

/// A finished line item as stored and exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Source product
    pub product_id: i64,
    /// Category snapshot
    pub category_id: Option<i64>,
    /// Category name snapshot
    pub category_name: Option<String>,
    /// Product name
    pub name: String,
    /// Unit label
    pub unit: String,
    /// Unit price
    pub price: Decimal,
    /// Quantity
    pub quantity: Decimal,
    /// Line amount
    pub amount: Decimal,
}

impl From<WorkingItem> for LineItem {
    fn from(item: WorkingItem) -> Self {
        Self {
            product_id: item.product_id,
            category_id: Some(item.category_id),
            category_name: Some(item.category_name),
            name: item.name,
            unit: item.unit,
            price: item.price,
            quantity: item.quantity,
            amount: item.amount,
        }
    }
}

/// Why a warning was raised, with its numeric context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningReason {
    /// A daily category had no unused product left
    NoCandidates,
    /// Fewer candidates than the category minimum
    InsufficientCandidates {
        /// Candidates available
        available: usize,
        /// Configured minimum
        min_required: u32,
    },
    /// Even the cheapest selection found costs more than the budget ceiling
    MinCostAboveBudget {
        /// Minimum feasible cost of the selection
        min_cost: Decimal,
        /// Daily budget ceiling
        budget_max: Decimal,
    },
    /// Daily items total ended above the ceiling
    DailyTotalAboveMax {
        /// Daily items total
        total_amount: Decimal,
        /// Daily budget ceiling
        budget_max: Decimal,
    },
    /// Daily items total ended below the floor
    DailyTotalBelowMin {
        /// Daily items total
        total_amount: Decimal,
        /// Daily budget floor
        budget_min: Decimal,
    },
}

impl WarningReason {
    /// Operator-facing reason text.
    #[must_use]
    pub const fn text(&self) -> &'static str {
        match self {
            Self::NoCandidates => "品类无可用产品",
            Self::InsufficientCandidates { .. } => "品类产品数量不足以满足下限",
            Self::MinCostAboveBudget { .. } => "最低成本高于预算上限",
            Self::DailyTotalAboveMax { .. } => "日采总额高于预算上限",
            Self::DailyTotalBelowMin { .. } => "日采总额低于预算下限",
        }
    }
}

/// A non-fatal constraint violation recorded during generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Day the warning belongs to
    pub date: NaiveDate,
    /// Category involved, if any
    pub category_id: Option<i64>,
    /// Category name involved, if any
    pub category_name: Option<String>,
    /// Reason and context
    pub reason: WarningReason,
}

impl Warning {
    /// Warning scoped to a category.
    #[must_use]
    pub fn for_category(date: NaiveDate, category: &Category, reason: WarningReason) -> Self {
        Self {
            date,
            category_id: Some(category.id),
            category_name: Some(category.name.clone()),
            reason,
        }
    }

    /// Warning about the whole day.
    #[must_use]
    pub const fn for_day(date: NaiveDate, reason: WarningReason) -> Self {
        Self {
            date,
            category_id: None,
            category_name: None,
            reason,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.date)?;
        if let Some(name) = &self.category_name {
            write!(f, "[{name}] ")?;
        }
        f.write_str(self.reason.text())?;
        match &self.reason {
            WarningReason::NoCandidates => Ok(()),
            WarningReason::InsufficientCandidates {
                available,
                min_required,
            } => write!(f, " (available {available}, min {min_required})"),
            WarningReason::MinCostAboveBudget {
                min_cost,
                budget_max,
            } => write!(f, " (min cost {min_cost}, max {budget_max})"),
            WarningReason::DailyTotalAboveMax {
                total_amount,
                budget_max,
            } => write!(f, " (total {total_amount}, max {budget_max})"),
            WarningReason::DailyTotalBelowMin {
                total_amount,
                budget_min,
            } => write!(f, " (total {total_amount}, min {budget_min})"),
        }
    }
}

/// Warnings collected for one stage, merged upward by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Records a warning.
    pub fn push(&mut self, warning: Warning) {
        tracing::debug!(%warning, "plan warning");
        self.warnings.push(warning);
    }

    /// Moves every warning of `other` into this sink.
    pub fn merge(&mut self, other: Self) {
        self.warnings.extend(other.warnings);
    }

    /// Recorded warnings.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consumes the sink.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// Generated (or stored) purchasing plan for one workday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    /// Workday
    pub date: NaiveDate,
    /// `YYYY-MM`
    pub year_month: String,
    /// Ordered line items
    pub items: Vec<LineItem>,
    /// Rounded sum of item amounts
    pub total_amount: Decimal,
    /// Warnings raised for this day
    pub warnings: Vec<Warning>,
    /// Who generated the plan
    pub creator_id: Option<String>,
    /// Who last edited the plan
    pub updated_by: Option<String>,
    /// Creation time
    pub created_at: NaiveDateTime,
    /// Last modification time
    pub updated_at: NaiveDateTime,
}

/// Rounded money total of a set of line items.
#[must_use]
pub fn items_total(items: &[LineItem]) -> Decimal {
    round_to(items.iter().map(|item| item.amount).sum(), MONEY_PRECISION)
}
