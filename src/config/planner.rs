//! Planner configuration loading from config.toml
//!
//! The file holds the daily budget range, workday overrides, export precision and an
//! optional seed catalog. The catalog is only written into an empty database; once
//! categories exist the database is the source of truth.

use crate::{
    core::{
        category::{create_category, get_all_categories, get_category_by_name},
        model::{BudgetRange, CountRange, PurchaseMode, QuantityRange},
        numeric::MONEY_PRECISION,
        product::{ProductDraft, create_product},
        workdays::WeekdayCalendar,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Config file used when `PLANNER_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Daily budget range applied at startup
    pub budget: Option<BudgetConfig>,
    /// Calendar overrides
    #[serde(default)]
    pub workdays: WorkdaysConfig,
    /// Statement settings
    #[serde(default)]
    pub export: ExportConfig,
    /// Categories to seed
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    /// Products to seed
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// `[budget]` table
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BudgetConfig {
    /// Daily floor
    pub min: Decimal,
    /// Daily ceiling
    pub max: Decimal,
}

/// `[workdays]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkdaysConfig {
    /// Weekdays that are not worked
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Weekend days that are worked
    #[serde(default)]
    pub extra_workdays: Vec<NaiveDate>,
}

/// `[export]` table
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExportConfig {
    /// Fraction digits shown on statements
    #[serde(default = "default_precision")]
    pub precision: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

const fn default_precision() -> u32 {
    MONEY_PRECISION
}

/// One `[[categories]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// Category name
    pub name: String,
    /// `daily` or `periodic`; absent means no rule yet
    pub mode: Option<String>,
    /// Fewest products per occurrence
    pub items_min: Option<u32>,
    /// Most products per occurrence
    pub items_max: Option<u32>,
    /// Periodic interval in days
    pub cycle_days: Option<u32>,
    /// Periodic jitter in days
    pub float_days: Option<u32>,
}

impl CategoryConfig {
    /// Purchasing rule described by this entry.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRule`] for an unknown mode, a missing field, or values that
    /// break the rule invariants.
    pub fn purchase_mode(&self) -> Result<PurchaseMode> {
        let Some(mode) = self.mode.as_deref() else {
            return Ok(PurchaseMode::Unset);
        };
        let missing = |field: &str| Error::InvalidRule {
            message: format!("category {} is missing {field}", self.name),
        };
        let items = CountRange::new(
            self.items_min.ok_or_else(|| missing("items_min"))?,
            self.items_max.ok_or_else(|| missing("items_max"))?,
        )?;
        match mode {
            "daily" => Ok(PurchaseMode::daily(items)),
            "periodic" => PurchaseMode::periodic(
                items,
                self.cycle_days.ok_or_else(|| missing("cycle_days"))?,
                self.float_days.unwrap_or(0),
            ),
            other => Err(Error::InvalidRule {
                message: format!("unknown purchase mode '{other}' for category {}", self.name),
            }),
        }
    }
}

/// One `[[products]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    /// Product name
    pub name: String,
    /// Name of the owning category
    pub category: String,
    /// Unit label
    pub unit: String,
    /// Reference unit price
    pub base_price: Decimal,
    /// Relative price drift
    pub volatility: Option<Decimal>,
    /// Smallest quantity per item
    pub quantity_min: Option<Decimal>,
    /// Largest quantity per item
    pub quantity_max: Option<Decimal>,
}

impl Config {
    /// Validated budget range, if configured.
    ///
    /// # Errors
    /// Returns [`Error::BudgetRangeInvalid`] when `min > max`.
    pub fn budget_range(&self) -> Result<Option<BudgetRange>> {
        self.budget
            .map(|budget| BudgetRange::new(budget.min, budget.max))
            .transpose()
    }

    /// Monday to Friday calendar with the configured overrides.
    #[must_use]
    pub fn calendar(&self) -> WeekdayCalendar {
        WeekdayCalendar::with_overrides(
            self.workdays.holidays.iter().copied(),
            self.workdays.extra_workdays.iter().copied(),
        )
    }
}

/// Loads planner configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `PLANNER_CONFIG`, or ./config.toml by default
///
/// A missing default file yields an empty configuration.
pub fn load_default_config() -> Result<Config> {
    match std::env::var("PLANNER_CONFIG") {
        Ok(path) => load_config(path),
        Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => {
            warn!("{DEFAULT_CONFIG_PATH} not found, using empty configuration");
            Ok(Config::default())
        }
        Err(_) => load_config(DEFAULT_CONFIG_PATH),
    }
}

/// Writes the configured catalog into an empty database.
///
/// Returns the number of categories and products created; nothing is written when any
/// category already exists. All entries are written in one transaction, so a bad entry
/// leaves the catalog empty.
///
/// # Errors
/// Returns an error if an entry is invalid, a product names an unknown category, or a
/// write fails.
pub async fn seed_catalog(db: &DatabaseConnection, config: &Config) -> Result<(usize, usize)> {
    if !get_all_categories(db).await?.is_empty() {
        info!("catalog already present, seeding skipped");
        return Ok((0, 0));
    }

    let txn = db.begin().await?;
    for entry in &config.categories {
        create_category(&txn, &entry.name, entry.purchase_mode()?).await?;
    }
    for entry in &config.products {
        let category = get_category_by_name(&txn, &entry.category)
            .await?
            .ok_or_else(|| Error::CategoryNotFound {
                name: entry.category.clone(),
            })?;
        let quantity_range = match (entry.quantity_min, entry.quantity_max) {
            (Some(min), Some(max)) => Some(QuantityRange::new(min, max)?),
            _ => None,
        };
        let draft = ProductDraft {
            name: entry.name.clone(),
            category_id: category.id,
            unit: entry.unit.clone(),
            base_price: entry.base_price,
            volatility: entry.volatility,
            quantity_range,
        };
        create_product(&txn, &draft).await?;
    }
    txn.commit().await?;

    info!(
        categories = config.categories.len(),
        products = config.products.len(),
        "catalog seeded"
    );
    Ok((config.categories.len(), config.products.len()))
}
