//! Stored procurement plans - persistence, lookups and edits.
//!
//! Plans are written in bulk after generation succeeds. Most functions are generic over
//! [`ConnectionTrait`] so regeneration can delete and insert inside one transaction.

use crate::{
    core::{
        model::{DayPlan, LineItem, items_total},
        numeric::parse_stored,
        workdays::YearMonth,
    },
    entities::{PlanItem, ProcurementPlan, Product, plan_item, procurement_plan, product},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, ConnectionTrait, PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Spending summary of one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub year_month: String,
    /// Number of stored day plans
    pub plan_count: usize,
    /// Sum of the plans' totals
    pub total_amount: Decimal,
}

fn item_from_model(model: &plan_item::Model) -> Result<LineItem> {
    Ok(LineItem {
        product_id: model.product_id,
        category_id: model.category_id,
        category_name: model.category_name.clone(),
        name: model.name.clone(),
        unit: model.unit.clone(),
        price: parse_stored("price", &model.price)?,
        quantity: parse_stored("quantity", &model.quantity)?,
        amount: parse_stored("amount", &model.amount)?,
    })
}

fn plan_from_models(plan: procurement_plan::Model, mut items: Vec<plan_item::Model>) -> Result<DayPlan> {
    items.sort_by_key(|item| item.position);
    Ok(DayPlan {
        date: plan.plan_date,
        year_month: plan.year_month,
        items: items.iter().map(item_from_model).collect::<Result<_>>()?,
        total_amount: parse_stored("total_amount", &plan.total_amount)?,
        warnings: serde_json::from_str(&plan.warnings)?,
        creator_id: plan.creator_id,
        updated_by: plan.updated_by,
        created_at: plan.created_at,
        updated_at: plan.updated_at,
    })
}

async fn insert_items<C>(db: &C, plan_id: i64, items: &[LineItem]) -> Result<()>
where
    C: ConnectionTrait,
{
    if items.is_empty() {
        return Ok(());
    }
    let mut rows = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        rows.push(plan_item::ActiveModel {
            plan_id: Set(plan_id),
            position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            product_id: Set(item.product_id),
            category_id: Set(item.category_id),
            category_name: Set(item.category_name.clone()),
            name: Set(item.name.clone()),
            unit: Set(item.unit.clone()),
            price: Set(item.price.to_string()),
            quantity: Set(item.quantity.to_string()),
            amount: Set(item.amount.to_string()),
            ..Default::default()
        });
    }
    PlanItem::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Month keys among `keys` that already have stored plans, sorted.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn existing_months<C>(db: &C, keys: &[String]) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    ProcurementPlan::find()
        .select_only()
        .column(procurement_plan::Column::YearMonth)
        .distinct()
        .filter(procurement_plan::Column::YearMonth.is_in(keys.iter().cloned()))
        .order_by_asc(procurement_plan::Column::YearMonth)
        .into_tuple::<String>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Inserts generated plans with their items.
///
/// # Errors
/// Returns an error if warnings cannot be encoded or an insert fails.
pub async fn save_plans<C>(db: &C, plans: &[DayPlan]) -> Result<()>
where
    C: ConnectionTrait,
{
    for plan in plans {
        let stored = procurement_plan::ActiveModel {
            plan_date: Set(plan.date),
            year_month: Set(plan.year_month.clone()),
            total_amount: Set(plan.total_amount.to_string()),
            warnings: Set(serde_json::to_string(&plan.warnings)?),
            creator_id: Set(plan.creator_id.clone()),
            updated_by: Set(plan.updated_by.clone()),
            created_at: Set(plan.created_at),
            updated_at: Set(plan.updated_at),
            ..Default::default()
        }
        .insert(db)
        .await?;
        insert_items(db, stored.id, &plan.items).await?;
    }
    Ok(())
}

/// Deletes every plan (and its items) of the given months. Returns the number of plans
/// removed.
///
/// # Errors
/// Returns an error if a delete fails.
pub async fn delete_months<C>(db: &C, keys: &[String]) -> Result<u64>
where
    C: ConnectionTrait,
{
    if keys.is_empty() {
        return Ok(0);
    }
    let plan_ids: Vec<i64> = ProcurementPlan::find()
        .select_only()
        .column(procurement_plan::Column::Id)
        .filter(procurement_plan::Column::YearMonth.is_in(keys.iter().cloned()))
        .into_tuple()
        .all(db)
        .await?;
    if plan_ids.is_empty() {
        return Ok(0);
    }
    PlanItem::delete_many()
        .filter(plan_item::Column::PlanId.is_in(plan_ids.clone()))
        .exec(db)
        .await?;
    let deleted = ProcurementPlan::delete_many()
        .filter(procurement_plan::Column::Id.is_in(plan_ids))
        .exec(db)
        .await?;
    Ok(deleted.rows_affected)
}

/// Deletes one month of plans atomically.
///
/// # Errors
/// Returns an error if the transaction fails.
#[instrument(skip(db), fields(month = %month))]
pub async fn delete_month(db: &DatabaseConnection, month: YearMonth) -> Result<u64> {
    let txn = db.begin().await?;
    let deleted = delete_months(&txn, &[month.to_string()]).await?;
    txn.commit().await?;
    info!(deleted, "month plans deleted");
    Ok(deleted)
}

/// Stored plans of the given months, ordered by date.
///
/// # Errors
/// Returns an error if the query fails or a stored value cannot be decoded.
pub async fn list_plans<C>(db: &C, keys: &[String]) -> Result<Vec<DayPlan>>
where
    C: ConnectionTrait,
{
    ProcurementPlan::find()
        .filter(procurement_plan::Column::YearMonth.is_in(keys.iter().cloned()))
        .order_by_asc(procurement_plan::Column::PlanDate)
        .find_with_related(PlanItem)
        .all(db)
        .await?
        .into_iter()
        .map(|(plan, items)| plan_from_models(plan, items))
        .collect()
}

/// Stored plan of a single day.
///
/// # Errors
/// Returns an error if the query fails or a stored value cannot be decoded.
pub async fn get_plan_by_date<C>(db: &C, date: NaiveDate) -> Result<Option<DayPlan>>
where
    C: ConnectionTrait,
{
    let Some(plan) = ProcurementPlan::find()
        .filter(procurement_plan::Column::PlanDate.eq(date))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    let items = plan.find_related(PlanItem).all(db).await?;
    plan_from_models(plan, items).map(Some)
}

fn validate_item(item: &LineItem) -> Result<()> {
    if item.name.trim().is_empty() {
        return Err(Error::Config {
            message: "Item name cannot be empty".to_string(),
        });
    }
    for value in [item.price, item.quantity, item.amount] {
        if value < Decimal::ZERO {
            return Err(Error::InvalidAmount { amount: value });
        }
    }
    Ok(())
}

/// Replaces the items of a stored plan and recomputes its total.
///
/// # Errors
/// Returns [`Error::PlanNotFound`] when no plan exists for `date`, a validation error for
/// negative values or empty names, or an error if a write fails.
#[instrument(skip(db, items))]
pub async fn update_plan_items(
    db: &DatabaseConnection,
    date: NaiveDate,
    items: Vec<LineItem>,
    updated_by: Option<&str>,
) -> Result<DayPlan> {
    for item in &items {
        validate_item(item)?;
    }
    let txn = db.begin().await?;
    let plan = ProcurementPlan::find()
        .filter(procurement_plan::Column::PlanDate.eq(date))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::PlanNotFound {
            date: date.to_string(),
        })?;
    let plan_id = plan.id;

    PlanItem::delete_many()
        .filter(plan_item::Column::PlanId.eq(plan_id))
        .exec(&txn)
        .await?;
    insert_items(&txn, plan_id, &items).await?;

    let mut active: procurement_plan::ActiveModel = plan.into();
    active.total_amount = Set(items_total(&items).to_string());
    active.updated_by = Set(updated_by.map(ToString::to_string));
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(&txn).await?;

    let updated = get_plan_by_date(&txn, date).await?;
    txn.commit().await?;
    updated.ok_or_else(|| Error::PlanNotFound {
        date: date.to_string(),
    })
}

/// Latest plan date that contains `product_id`, ignoring plans of `excluded_months`.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn most_recent_purchase_date<C>(
    db: &C,
    product_id: i64,
    excluded_months: &[String],
) -> Result<Option<NaiveDate>>
where
    C: ConnectionTrait,
{
    let mut query = ProcurementPlan::find()
        .inner_join(PlanItem)
        .filter(plan_item::Column::ProductId.eq(product_id));
    if !excluded_months.is_empty() {
        query = query.filter(
            procurement_plan::Column::YearMonth.is_not_in(excluded_months.iter().cloned()),
        );
    }
    Ok(query
        .order_by_desc(procurement_plan::Column::PlanDate)
        .one(db)
        .await?
        .map(|plan| plan.plan_date))
}

/// Per-month totals of one year, ordered by month.
///
/// # Errors
/// Returns an error if the query fails or a stored total cannot be parsed.
pub async fn monthly_totals<C>(db: &C, year: i32) -> Result<Vec<MonthTotal>>
where
    C: ConnectionTrait,
{
    let rows: Vec<(String, String)> = ProcurementPlan::find()
        .select_only()
        .column(procurement_plan::Column::YearMonth)
        .column(procurement_plan::Column::TotalAmount)
        .filter(procurement_plan::Column::YearMonth.starts_with(format!("{year}-")))
        .into_tuple()
        .all(db)
        .await?;

    let mut totals: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
    for (year_month, total) in rows {
        let entry = totals.entry(year_month).or_default();
        entry.0 += 1;
        entry.1 += parse_stored("total_amount", &total)?;
    }
    Ok(totals
        .into_iter()
        .map(|(year_month, (plan_count, total_amount))| MonthTotal {
            year_month,
            plan_count,
            total_amount,
        })
        .collect())
}

/// Criteria for [`search_history`]. Unset fields match every plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Calendar year of the plan
    pub year: Option<i32>,
    /// Month of `year`; ignored without a year
    pub month: Option<u32>,
    /// Case-insensitive fragment of an item name
    pub keyword: Option<String>,
    /// Category of an item, by snapshot or by the product's current category
    pub category_id: Option<i64>,
}

async fn plan_ids_with_item<C>(db: &C, condition: Condition) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    PlanItem::find()
        .select_only()
        .column(plan_item::Column::PlanId)
        .distinct()
        .filter(condition)
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Searches stored plans, newest first, returning one page of `(date, total)` pairs and
/// the number of matching plans.
///
/// Pages start at 1; page 0 is read as page 1. The keyword and category criteria may be
/// met by different items of the same plan.
///
/// # Errors
/// Returns an error if the month is outside 1 to 12, a query fails, or a stored total
/// cannot be parsed.
#[instrument(skip(db))]
pub async fn search_history<C>(
    db: &C,
    filter: &HistoryFilter,
    page: u64,
    page_size: u64,
) -> Result<(Vec<(NaiveDate, Decimal)>, u64)>
where
    C: ConnectionTrait,
{
    let mut query = ProcurementPlan::find();
    match (filter.year, filter.month) {
        (Some(year), Some(month)) => {
            let key = YearMonth::new(year, month)?.to_string();
            query = query.filter(procurement_plan::Column::YearMonth.eq(key));
        }
        (Some(year), None) => {
            query = query.filter(procurement_plan::Column::YearMonth.starts_with(format!("{year}-")));
        }
        _ => {}
    }

    if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        let ids =
            plan_ids_with_item(db, Condition::all().add(plan_item::Column::Name.contains(keyword)))
                .await?;
        if ids.is_empty() {
            return Ok((Vec::new(), 0));
        }
        query = query.filter(procurement_plan::Column::Id.is_in(ids));
    }

    if let Some(category_id) = filter.category_id {
        let product_ids: Vec<i64> = Product::find()
            .select_only()
            .column(product::Column::Id)
            .filter(product::Column::CategoryId.eq(category_id))
            .filter(product::Column::IsDeleted.eq(false))
            .into_tuple()
            .all(db)
            .await?;
        let mut condition = Condition::any().add(plan_item::Column::CategoryId.eq(category_id));
        if !product_ids.is_empty() {
            condition = condition.add(plan_item::Column::ProductId.is_in(product_ids));
        }
        let ids = plan_ids_with_item(db, condition).await?;
        if ids.is_empty() {
            return Ok((Vec::new(), 0));
        }
        query = query.filter(procurement_plan::Column::Id.is_in(ids));
    }

    let total = query.clone().count(db).await?;
    let rows: Vec<(NaiveDate, String)> = query
        .select_only()
        .column(procurement_plan::Column::PlanDate)
        .column(procurement_plan::Column::TotalAmount)
        .order_by_desc(procurement_plan::Column::PlanDate)
        .offset(page.saturating_sub(1).saturating_mul(page_size))
        .limit(page_size)
        .into_tuple()
        .all(db)
        .await?;

    let entries = rows
        .into_iter()
        .map(|(date, total_amount)| Ok((date, parse_stored("total_amount", &total_amount)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok((entries, total))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::model::{Warning, WarningReason};
    use crate::test_utils::*;

    fn d(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(product_id: i64, name: &str, amount: &str) -> LineItem {
        LineItem {
            product_id,
            category_id: Some(1),
            category_name: Some("蔬菜".to_string()),
            name: name.to_string(),
            unit: "斤".to_string(),
            price: d("2.00"),
            quantity: d("1.5"),
            amount: d(amount),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_plan() -> Result<()> {
        let db = setup_test_db().await?;
        let mut plan = sample_plan(date(2026, 2, 3), vec![item(1, "青菜", "3.00"), item(2, "萝卜", "1.20")]);
        plan.warnings.push(Warning::for_day(
            plan.date,
            WarningReason::DailyTotalBelowMin {
                total_amount: d("4.20"),
                budget_min: d("100"),
            },
        ));
        save_plans(&db, std::slice::from_ref(&plan)).await?;

        let loaded = get_plan_by_date(&db, plan.date).await?.unwrap();
        assert_eq!(loaded.items, plan.items);
        assert_eq!(loaded.total_amount, d("4.20"));
        assert_eq!(loaded.total_amount.to_string(), "4.20");
        assert_eq!(loaded.warnings, plan.warnings);
        assert!(get_plan_by_date(&db, date(2026, 2, 4)).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_months_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        save_plans(
            &db,
            &[
                sample_plan(date(2026, 1, 30), vec![item(1, "青菜", "3.00")]),
                sample_plan(date(2026, 2, 2), vec![item(1, "青菜", "3.00")]),
                sample_plan(date(2026, 2, 3), vec![item(2, "萝卜", "2.00")]),
            ],
        )
        .await?;

        let keys = vec!["2026-02".to_string(), "2026-03".to_string()];
        assert_eq!(existing_months(&db, &keys).await?, vec!["2026-02"]);

        let deleted = delete_month(&db, YearMonth::new(2026, 2)?).await?;
        assert_eq!(deleted, 2);
        assert!(existing_months(&db, &keys).await?.is_empty());
        assert_eq!(PlanItem::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_plans_ordered_by_date() -> Result<()> {
        let db = setup_test_db().await?;
        save_plans(
            &db,
            &[
                sample_plan(date(2026, 2, 5), vec![item(1, "青菜", "3.00")]),
                sample_plan(date(2026, 2, 3), vec![item(2, "萝卜", "2.00")]),
            ],
        )
        .await?;
        let plans = list_plans(&db, &["2026-02".to_string()]).await?;
        let dates: Vec<NaiveDate> = plans.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2026, 2, 3), date(2026, 2, 5)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_items_recomputes_total() -> Result<()> {
        let db = setup_test_db().await?;
        save_plans(&db, &[sample_plan(date(2026, 2, 3), vec![item(1, "青菜", "3.00")])]).await?;

        let updated = update_plan_items(
            &db,
            date(2026, 2, 3),
            vec![item(1, "青菜", "4.50"), item(3, "土豆", "2.25")],
            Some("editor"),
        )
        .await?;
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.total_amount, d("6.75"));
        assert_eq!(updated.updated_by.as_deref(), Some("editor"));

        let missing = update_plan_items(&db, date(2026, 2, 4), Vec::new(), None).await;
        assert!(matches!(missing, Err(Error::PlanNotFound { .. })));

        let negative = update_plan_items(&db, date(2026, 2, 3), vec![item(1, "青菜", "-1")], None).await;
        assert!(matches!(negative, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_most_recent_purchase_respects_exclusions() -> Result<()> {
        let db = setup_test_db().await?;
        save_plans(
            &db,
            &[
                sample_plan(date(2026, 1, 20), vec![item(7, "大米", "80.00")]),
                sample_plan(date(2026, 2, 10), vec![item(7, "大米", "80.00")]),
                sample_plan(date(2026, 2, 11), vec![item(8, "面粉", "40.00")]),
            ],
        )
        .await?;

        assert_eq!(
            most_recent_purchase_date(&db, 7, &[]).await?,
            Some(date(2026, 2, 10))
        );
        assert_eq!(
            most_recent_purchase_date(&db, 7, &["2026-02".to_string()]).await?,
            Some(date(2026, 1, 20))
        );
        assert_eq!(most_recent_purchase_date(&db, 99, &[]).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_totals() -> Result<()> {
        let db = setup_test_db().await?;
        save_plans(
            &db,
            &[
                sample_plan(date(2026, 1, 5), vec![item(1, "青菜", "10.50")]),
                sample_plan(date(2026, 1, 6), vec![item(1, "青菜", "4.50")]),
                sample_plan(date(2026, 3, 2), vec![item(1, "青菜", "7.00")]),
                sample_plan(date(2025, 12, 31), vec![item(1, "青菜", "9.00")]),
            ],
        )
        .await?;

        let totals = monthly_totals(&db, 2026).await?;
        assert_eq!(
            totals,
            vec![
                MonthTotal {
                    year_month: "2026-01".to_string(),
                    plan_count: 2,
                    total_amount: d("15.00"),
                },
                MonthTotal {
                    year_month: "2026-03".to_string(),
                    plan_count: 1,
                    total_amount: d("7.00"),
                },
            ]
        );
        Ok(())
    }

    fn in_category(mut item: LineItem, category_id: Option<i64>) -> LineItem {
        item.category_id = category_id;
        item.category_name = None;
        item
    }

    #[tokio::test]
    async fn test_search_history_filters_and_pages() -> Result<()> {
        let (db, vegetables) = setup_with_category().await?;
        let greens = create_test_product(&db, vegetables.id, "青菜", "3.00").await?;
        let other = Some(vegetables.id + 100);
        save_plans(
            &db,
            &[
                sample_plan(
                    date(2025, 12, 30),
                    vec![in_category(item(2, "萝卜", "1.00"), Some(vegetables.id))],
                ),
                // Older snapshot without a category, matched through the product
                sample_plan(
                    date(2026, 1, 5),
                    vec![in_category(item(greens.id, "青菜", "3.00"), None)],
                ),
                sample_plan(date(2026, 2, 3), vec![in_category(item(50, "Tofu", "5.00"), other)]),
                sample_plan(
                    date(2026, 2, 4),
                    vec![
                        in_category(item(3, "土豆", "2.25"), Some(vegetables.id)),
                        in_category(item(50, "Tofu", "5.00"), other),
                    ],
                ),
            ],
        )
        .await?;

        let (all, total) = search_history(&db, &HistoryFilter::default(), 1, 20).await?;
        assert_eq!(total, 4);
        let dates: Vec<NaiveDate> = all.iter().map(|(date, _)| *date).collect();
        assert_eq!(
            dates,
            vec![date(2026, 2, 4), date(2026, 2, 3), date(2026, 1, 5), date(2025, 12, 30)]
        );

        let year = HistoryFilter {
            year: Some(2026),
            ..HistoryFilter::default()
        };
        assert_eq!(search_history(&db, &year, 1, 20).await?.1, 3);

        let february = HistoryFilter {
            year: Some(2026),
            month: Some(2),
            ..HistoryFilter::default()
        };
        let (entries, total) = search_history(&db, &february, 1, 20).await?;
        assert_eq!(total, 2);
        assert_eq!(
            entries,
            vec![(date(2026, 2, 4), d("7.25")), (date(2026, 2, 3), d("5.00"))]
        );

        let keyword = HistoryFilter {
            keyword: Some("tofu".to_string()),
            ..HistoryFilter::default()
        };
        assert_eq!(search_history(&db, &keyword, 1, 20).await?.1, 2);

        let category = HistoryFilter {
            category_id: Some(vegetables.id),
            ..HistoryFilter::default()
        };
        let (entries, total) = search_history(&db, &category, 1, 20).await?;
        assert_eq!(total, 3);
        let dates: Vec<NaiveDate> = entries.iter().map(|(date, _)| *date).collect();
        assert_eq!(dates, vec![date(2026, 2, 4), date(2026, 1, 5), date(2025, 12, 30)]);

        let both = HistoryFilter {
            keyword: Some("Tofu".to_string()),
            category_id: Some(vegetables.id),
            ..HistoryFilter::default()
        };
        let (entries, total) = search_history(&db, &both, 1, 20).await?;
        assert_eq!(total, 1);
        assert_eq!(entries[0].0, date(2026, 2, 4));

        let none = HistoryFilter {
            category_id: Some(999),
            ..HistoryFilter::default()
        };
        assert_eq!(search_history(&db, &none, 1, 20).await?, (Vec::new(), 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_history_pagination() -> Result<()> {
        let db = setup_test_db().await?;
        let plans: Vec<DayPlan> = (2..=6)
            .map(|day| sample_plan(date(2026, 3, day), vec![item(1, "青菜", "3.00")]))
            .collect();
        save_plans(&db, &plans).await?;
        let filter = HistoryFilter::default();

        let (first, total) = search_history(&db, &filter, 1, 2).await?;
        assert_eq!(total, 5);
        let dates: Vec<NaiveDate> = first.iter().map(|(date, _)| *date).collect();
        assert_eq!(dates, vec![date(2026, 3, 6), date(2026, 3, 5)]);

        let (last, total) = search_history(&db, &filter, 3, 2).await?;
        assert_eq!(total, 5);
        assert_eq!(last, vec![(date(2026, 3, 2), d("3.00"))]);

        // Page 0 reads as the first page
        assert_eq!(search_history(&db, &filter, 0, 2).await?.0, first);
        assert!(search_history(&db, &filter, 4, 2).await?.0.is_empty());

        let bad_month = HistoryFilter {
            year: Some(2026),
            month: Some(13),
            ..HistoryFilter::default()
        };
        assert!(matches!(
            search_history(&db, &bad_month, 1, 2).await,
            Err(Error::InvalidMonthRange { .. })
        ));
        Ok(())
    }
}
