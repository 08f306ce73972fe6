//! Database-backed implementation of the generator's reader traits.

use crate::{
    core::{
        category, plan,
        generator::{BudgetConfigReader, CatalogReader, HistoryReader},
        model::{BudgetRange, Category, Product},
        product,
        rules::{RuleGaps, collect_rule_gaps},
        settings,
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Reads the catalog, purchase history and budget settings from the database.
///
/// History lookups ignore plans of `excluded_months`, so months about to be replaced do
/// not shape their own periodic schedule.
#[derive(Debug, Clone)]
pub struct DbStore<'a> {
    db: &'a DatabaseConnection,
    excluded_months: Vec<String>,
}

impl<'a> DbStore<'a> {
    /// Store reading every stored plan as history.
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self {
            db,
            excluded_months: Vec::new(),
        }
    }

    /// Ignores the history of the given `YYYY-MM` months.
    #[must_use]
    pub fn excluding(mut self, months: Vec<String>) -> Self {
        self.excluded_months = months;
        self
    }
}

impl CatalogReader for DbStore<'_> {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(category::get_all_categories(self.db)
            .await?
            .iter()
            .map(category::to_domain)
            .collect())
    }

    async fn list_active_products(&self) -> Result<Vec<Product>> {
        product::get_all_active_products(self.db)
            .await?
            .iter()
            .map(product::to_domain)
            .collect()
    }
}

impl HistoryReader for DbStore<'_> {
    async fn most_recent_purchase_date(&self, product_id: i64) -> Result<Option<NaiveDate>> {
        plan::most_recent_purchase_date(self.db, product_id, &self.excluded_months).await
    }
}

impl BudgetConfigReader for DbStore<'_> {
    async fn daily_budget_range(&self) -> Result<Option<BudgetRange>> {
        settings::get_daily_budget_range(self.db).await
    }
}

/// Categories that would block generation, and categories with no products.
///
/// # Errors
/// Returns an error if a query fails or a stored product cannot be decoded.
pub async fn rule_gaps(db: &DatabaseConnection) -> Result<RuleGaps> {
    let store = DbStore::new(db);
    let categories = store.list_categories().await?;
    let products = store.list_active_products().await?;
    Ok(collect_rule_gaps(&categories, &products))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        category::create_category,
        model::{CountRange, PurchaseMode},
        plan::save_plans,
        settings::set_daily_budget_range,
    };
    use crate::test_utils::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_store_reads_catalog_and_budget() -> Result<()> {
        let (db, vegetables) = setup_with_category().await?;
        create_test_product(&db, vegetables.id, "青菜", "4.00").await?;
        set_daily_budget_range(&db, BudgetRange::new(Decimal::from(100), Decimal::from(200))?)
            .await?;

        let store = DbStore::new(&db);
        let categories = store.list_categories().await?;
        assert_eq!(categories.len(), 1);
        assert!(categories[0].has_complete_rule());

        let products = store.list_active_products().await?;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].base_price, "4.00".parse::<Decimal>().unwrap());

        let budget = store.daily_budget_range().await?.unwrap();
        assert_eq!(budget.max, Decimal::from(200));
        Ok(())
    }

    #[tokio::test]
    async fn test_history_excludes_months() -> Result<()> {
        let db = setup_test_db().await?;
        let day = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let mut stored = sample_plan(day, Vec::new());
        stored.items.push(sample_line_item(5, "大米"));
        save_plans(&db, &[stored]).await?;

        assert_eq!(DbStore::new(&db).most_recent_purchase_date(5).await?, Some(day));
        let excluding = DbStore::new(&db).excluding(vec!["2026-02".to_string()]);
        assert_eq!(excluding.most_recent_purchase_date(5).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_rule_gaps_reports_unconfigured_categories() -> Result<()> {
        let db = setup_test_db().await?;
        let unset = create_category(&db, "调料", PurchaseMode::Unset).await?;
        create_test_product(&db, unset.id, "酱油", "12.00").await?;
        let empty = create_category(&db, "水果", PurchaseMode::daily(CountRange::new(1, 1)?)).await?;

        let gaps = rule_gaps(&db).await?;
        assert_eq!(gaps.categories_without_rules, vec![unset.id]);
        assert_eq!(gaps.categories_without_products, vec![empty.id]);
        assert!(gaps.blocks_generation());
        Ok(())
    }
}
