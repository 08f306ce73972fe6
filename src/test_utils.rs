//! Shared test utilities for the planner.
//!
//! This module provides common helper functions for setting up test databases,
//! creating catalog rows with sensible defaults, and an in-memory source for the
//! generator's reader traits.

use crate::{
    core::{
        category,
        generator::{BudgetConfigReader, CatalogReader, HistoryReader},
        model::{
            BudgetRange, Category, CountRange, DayPlan, LineItem, Product, PurchaseMode,
            QuantityRange, items_total,
        },
        product::{self, ProductDraft},
        workdays::YearMonth,
    },
    entities,
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a daily category picking 1 to 2 products per workday.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::category::Model> {
    category::create_category(db, name, PurchaseMode::daily(CountRange::new(1, 2)?)).await
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * unit: 斤
/// * volatility: 0.1
/// * quantity range: 1 to 5
pub async fn create_test_product(
    db: &DatabaseConnection,
    category_id: i64,
    name: &str,
    price: &str,
) -> Result<entities::product::Model> {
    let base_price: Decimal = price.parse().map_err(|_| crate::errors::Error::InvalidDecimal {
        column: "base_price",
        value: price.to_string(),
    })?;
    let draft = ProductDraft {
        name: name.to_string(),
        category_id,
        unit: "斤".to_string(),
        base_price,
        volatility: Some(Decimal::new(1, 1)),
        quantity_range: Some(QuantityRange::new(Decimal::ONE, Decimal::from(5))?),
    };
    product::create_product(db, &draft).await
}

/// Sets up a test environment with a daily "蔬菜" category.
/// Returns (db, category) for catalog-related tests.
pub async fn setup_with_category() -> Result<(DatabaseConnection, entities::category::Model)> {
    let db = setup_test_db().await?;
    let category = create_test_category(&db, "蔬菜").await?;
    Ok((db, category))
}

/// A line item of 1.5 斤 at 2.00, amount 3.00.
#[must_use]
pub fn sample_line_item(product_id: i64, name: &str) -> LineItem {
    LineItem {
        product_id,
        category_id: Some(1),
        category_name: Some("蔬菜".to_string()),
        name: name.to_string(),
        unit: "斤".to_string(),
        price: Decimal::new(200, 2),
        quantity: Decimal::new(15, 1),
        amount: Decimal::new(300, 2),
    }
}

/// A plan for `date` whose total matches its items.
#[must_use]
pub fn sample_plan(date: NaiveDate, items: Vec<LineItem>) -> DayPlan {
    let now = Utc::now().naive_utc();
    DayPlan {
        date,
        year_month: YearMonth::of(date).to_string(),
        total_amount: items_total(&items),
        items,
        warnings: Vec::new(),
        creator_id: None,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory catalog, history and budget for generator tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    /// Every category
    pub categories: Vec<Category>,
    /// Active products
    pub products: Vec<Product>,
    /// Daily budget range
    pub budget: Option<BudgetRange>,
    /// Last purchase date per product id
    pub history: HashMap<i64, NaiveDate>,
}

impl CatalogReader for MemorySource {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }

    async fn list_active_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.clone())
    }
}

impl HistoryReader for MemorySource {
    async fn most_recent_purchase_date(&self, product_id: i64) -> Result<Option<NaiveDate>> {
        Ok(self.history.get(&product_id).copied())
    }
}

impl BudgetConfigReader for MemorySource {
    async fn daily_budget_range(&self) -> Result<Option<BudgetRange>> {
        Ok(self.budget)
    }
}
