//! Plan generation across a range of months.
//!
//! The generator reads a catalog snapshot through the reader traits, checks the fatal
//! preconditions, then walks every workday of every month: periodic items first, then one
//! budget-aware selection per daily category, then reconciliation against the day's
//! target. Every random draw of a day comes from a generator seeded with that date, so
//! regenerating an unchanged catalog reproduces the same plans.

use crate::{
    core::{
        item::build_item_at_min,
        model::{
            BudgetRange, Category, DayPlan, Diagnostics, LineItem, Product, PurchaseMode, Warning,
            WarningReason, WorkingItem,
        },
        numeric::{MONEY_PRECISION, check_precision, random_in_range, round_to},
        reconcile::{DailyPool, adjust_to_budget, top_up, working_total},
        rules::collect_rule_gaps,
        schedule::{build_periodic_schedule, place_periodic_items},
        selector::{plan_count, select_within_budget},
        workdays::{MonthRange, WorkdayProvider, YearMonth},
    },
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate, Utc};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Read access to categories and products.
#[allow(async_fn_in_trait)]
pub trait CatalogReader {
    /// Every category, active or not.
    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Products that are not deleted.
    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    async fn list_active_products(&self) -> Result<Vec<Product>>;
}

/// Read access to past purchases.
#[allow(async_fn_in_trait)]
pub trait HistoryReader {
    /// Latest plan date containing the product.
    ///
    /// # Errors
    /// Returns an error if the backing store fails.
    async fn most_recent_purchase_date(&self, product_id: i64) -> Result<Option<NaiveDate>>;
}

/// Read access to the budget settings.
#[allow(async_fn_in_trait)]
pub trait BudgetConfigReader {
    /// Configured daily budget range, if any.
    ///
    /// # Errors
    /// Returns an error if the backing store fails or the stored value is malformed.
    async fn daily_budget_range(&self) -> Result<Option<BudgetRange>>;
}

/// Plans and warnings of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Day plans ordered by date
    pub plans: Vec<DayPlan>,
    /// Warnings of every day, in generation order
    pub warnings: Vec<Warning>,
}

/// Random source of a single workday, seeded with the integer `YYYYMMDD`.
#[must_use]
pub fn rng_for_day(day: NaiveDate) -> StdRng {
    let seed = i64::from(day.year()) * 10_000 + i64::from(day.month()) * 100 + i64::from(day.day());
    StdRng::seed_from_u64(seed.unsigned_abs())
}

fn rng_for_month(month: YearMonth) -> StdRng {
    let seed = i64::from(month.year) * 100 + i64::from(month.month);
    StdRng::seed_from_u64(seed.unsigned_abs())
}

/// Catalog snapshot shared by every day of a run.
struct Snapshot<'a> {
    categories: BTreeMap<i64, &'a Category>,
    products: BTreeMap<i64, Vec<&'a Product>>,
    budget: BudgetRange,
}

impl<'a> Snapshot<'a> {
    fn periodic_groups(&self) -> Vec<(&'a Category, Vec<&'a Product>)> {
        self.categories
            .values()
            .filter(|c| matches!(c.mode, PurchaseMode::Periodic { .. }))
            .filter_map(|c| self.products.get(&c.id).map(|p| (*c, p.clone())))
            .collect()
    }
}

struct DayOutcome {
    plan: Option<DayPlan>,
    diagnostics: Diagnostics,
}

/// Generates purchasing plans from a catalog source and a workday calendar.
#[derive(Debug, Clone)]
pub struct PlanGenerator<S, W> {
    source: S,
    workdays: W,
    money_precision: u32,
}

impl<S, W> PlanGenerator<S, W>
where
    S: CatalogReader + HistoryReader + BudgetConfigReader,
    W: WorkdayProvider,
{
    /// Generator rounding money to two decimals.
    pub fn new(source: S, workdays: W) -> Self {
        Self {
            source,
            workdays,
            money_precision: MONEY_PRECISION,
        }
    }

    /// Overrides the money precision used for amounts.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPrecision`] when `precision` is above two digits.
    pub fn with_money_precision(mut self, precision: u32) -> Result<Self> {
        self.money_precision = check_precision(precision)?;
        Ok(self)
    }

    /// Generates plans for every workday of `range`.
    ///
    /// # Errors
    /// Fails without producing plans when a category has products but no complete rule,
    /// the catalog is empty, the budget range is missing or inverted, a product lacks the
    /// configuration needed to build an item, or a reader fails.
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    pub async fn generate(
        &self,
        range: MonthRange,
        creator_id: Option<&str>,
    ) -> Result<GenerationOutcome> {
        let categories = self.source.list_categories().await?;
        let mut products = self.source.list_active_products().await?;
        products.sort_by_key(|p| p.id);

        let gaps = collect_rule_gaps(&categories, &products);
        if gaps.blocks_generation() {
            return Err(Error::CategoriesWithoutRules {
                category_ids: gaps.categories_without_rules,
            });
        }
        if products.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let budget = self
            .source
            .daily_budget_range()
            .await?
            .ok_or(Error::BudgetRangeMissing)?;
        budget.validate()?;

        let mut by_category: BTreeMap<i64, Vec<&Product>> = BTreeMap::new();
        for product in &products {
            by_category.entry(product.category_id).or_default().push(product);
        }
        let snapshot = Snapshot {
            categories: categories
                .iter()
                .filter(|c| c.is_active)
                .map(|c| (c.id, c))
                .collect(),
            products: by_category,
            budget,
        };

        let mut outcome = GenerationOutcome::default();
        let mut run = Diagnostics::new();
        for month in range.months() {
            let workdays = self.workdays.workdays(month).await?;
            if workdays.is_empty() {
                debug!(%month, "no workdays, month skipped");
                continue;
            }

            let groups = snapshot.periodic_groups();
            let mut histories = HashMap::new();
            for product in groups.iter().flat_map(|(_, products)| products) {
                if let Some(last) = self.source.most_recent_purchase_date(product.id).await? {
                    histories.insert(product.id, last);
                }
            }
            let schedule = build_periodic_schedule(
                &groups,
                &histories,
                &workdays,
                month,
                &mut rng_for_month(month),
            );

            for day in workdays {
                let scheduled = schedule.get(&day).map_or(&[][..], Vec::as_slice);
                let day_outcome = self.plan_day(day, month, scheduled, &snapshot, creator_id)?;
                run.merge(day_outcome.diagnostics);
                if let Some(plan) = day_outcome.plan {
                    outcome.plans.push(plan);
                }
            }
        }
        outcome.warnings = run.into_warnings();

        info!(
            plans = outcome.plans.len(),
            warnings = outcome.warnings.len(),
            "plan generation finished"
        );
        Ok(outcome)
    }

    fn plan_day(
        &self,
        day: NaiveDate,
        month: YearMonth,
        scheduled: &[&Product],
        snapshot: &Snapshot<'_>,
        creator_id: Option<&str>,
    ) -> Result<DayOutcome> {
        let precision = self.money_precision;
        let budget = snapshot.budget;
        let mut rng = rng_for_day(day);
        let target = random_in_range(&mut rng, budget.min, budget.max, precision);
        let mut diagnostics = Diagnostics::new();
        let mut used_products = HashSet::new();

        let periodic_items = place_periodic_items(
            scheduled,
            &snapshot.categories,
            precision,
            &mut used_products,
            &mut rng,
        )?;

        let mut daily_items: Vec<WorkingItem> = Vec::new();
        let mut pools = Vec::new();
        for &category in snapshot.categories.values() {
            let PurchaseMode::Daily { items: count_range } = category.mode else {
                continue;
            };
            let candidates: Vec<&Product> = snapshot
                .products
                .get(&category.id)
                .into_iter()
                .flatten()
                .copied()
                .filter(|p| !used_products.contains(&p.id))
                .collect();
            if candidates.is_empty() {
                diagnostics.push(Warning::for_category(day, category, WarningReason::NoCandidates));
                continue;
            }

            let count = plan_count(count_range, candidates.len(), &mut rng);
            if count.short_of_minimum {
                diagnostics.push(Warning::for_category(
                    day,
                    category,
                    WarningReason::InsufficientCandidates {
                        available: candidates.len(),
                        min_required: count_range.min,
                    },
                ));
            }
            let selection =
                select_within_budget(&candidates, count.desired, budget.max, precision, &mut rng);
            if selection.min_cost > budget.max {
                diagnostics.push(Warning::for_category(
                    day,
                    category,
                    WarningReason::MinCostAboveBudget {
                        min_cost: round_to(selection.min_cost, precision),
                        budget_max: budget.max,
                    },
                ));
            }
            for product in &selection.products {
                daily_items.push(build_item_at_min(product, category, precision, &mut rng)?);
                used_products.insert(product.id);
            }
            pools.push(DailyPool {
                category,
                candidates,
                limit: count.limit,
                selected: selection.products.len(),
            });
        }

        if periodic_items.is_empty() && daily_items.is_empty() {
            debug!(%day, "no items, day skipped");
            return Ok(DayOutcome {
                plan: None,
                diagnostics,
            });
        }

        if !daily_items.is_empty() {
            top_up(
                &mut pools,
                &mut used_products,
                &mut daily_items,
                target,
                precision,
                &mut rng,
            )?;
            adjust_to_budget(&mut daily_items, target, precision);
        }

        let daily_total = working_total(&daily_items, precision);
        if daily_total > budget.max {
            diagnostics.push(Warning::for_day(
                day,
                WarningReason::DailyTotalAboveMax {
                    total_amount: daily_total,
                    budget_max: budget.max,
                },
            ));
        }
        if daily_total < budget.min {
            diagnostics.push(Warning::for_day(
                day,
                WarningReason::DailyTotalBelowMin {
                    total_amount: daily_total,
                    budget_min: budget.min,
                },
            ));
        }

        let items: Vec<LineItem> = periodic_items
            .into_iter()
            .chain(daily_items)
            .map(LineItem::from)
            .collect();
        let total_amount = round_to(items.iter().map(|i| i.amount).sum(), precision);
        let now = Utc::now().naive_utc();
        debug!(%day, %target, %total_amount, items = items.len(), "day planned");

        Ok(DayOutcome {
            plan: Some(DayPlan {
                date: day,
                year_month: month.to_string(),
                items,
                total_amount,
                warnings: diagnostics.warnings().to_vec(),
                creator_id: creator_id.map(ToString::to_string),
                updated_by: None,
                created_at: now,
                updated_at: now,
            }),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        model::{CountRange, QuantityRange, items_total},
        numeric::step_quantize,
        units::quantity_step_for_unit,
        workdays::{ListedWorkdays, WeekdayCalendar},
    };
    use crate::test_utils::MemorySource;
    use rust_decimal::Decimal;

    fn d(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn february() -> MonthRange {
        MonthRange::single(YearMonth::new(2026, 2).unwrap()).unwrap()
    }

    fn category(id: i64, name: &str, mode: PurchaseMode) -> Category {
        Category {
            id,
            name: name.to_string(),
            is_active: true,
            mode,
        }
    }

    fn product(
        id: i64,
        category: &Category,
        unit: &str,
        price: &str,
        volatility: &str,
        range: (&str, &str),
    ) -> Product {
        Product {
            id,
            name: format!("product {id}"),
            category_id: category.id,
            category_name: category.name.clone(),
            unit: unit.to_string(),
            base_price: d(price),
            volatility: Some(d(volatility)),
            quantity_range: Some(QuantityRange::new(d(range.0), d(range.1)).unwrap()),
        }
    }

    fn cabbage_source() -> MemorySource {
        let vegetables = category(1, "vegetables", PurchaseMode::daily(CountRange::new(1, 1).unwrap()));
        let mut cabbage = product(1, &vegetables, "斤", "3.00", "0", ("1", "2"));
        cabbage.name = "cabbage".to_string();
        MemorySource {
            categories: vec![vegetables],
            products: vec![cabbage],
            budget: Some(BudgetRange::new(d("100"), d("200")).unwrap()),
            ..MemorySource::default()
        }
    }

    fn mixed_source() -> MemorySource {
        let vegetables = category(1, "蔬菜", PurchaseMode::daily(CountRange::new(2, 3).unwrap()));
        let meat = category(2, "肉类", PurchaseMode::daily(CountRange::new(1, 2).unwrap()));
        let staples = category(
            3,
            "粮油",
            PurchaseMode::periodic(CountRange::new(2, 2).unwrap(), 7, 2).unwrap(),
        );
        let mut products = Vec::new();
        for id in 1..=6 {
            products.push(product(id, &vegetables, "斤", "4.50", "0.2", ("2", "30")));
        }
        for id in 7..=10 {
            products.push(product(id, &meat, "千克", "32", "0.1", ("1", "5")));
        }
        for id in 11..=12 {
            products.push(product(id, &staples, "袋", "85", "0.05", ("1", "2")));
        }
        MemorySource {
            categories: vec![vegetables, meat, staples],
            products,
            budget: Some(BudgetRange::new(d("300"), d("500")).unwrap()),
            ..MemorySource::default()
        }
    }

    #[tokio::test]
    async fn test_cabbage_day_is_capped_by_quantity_range() -> Result<()> {
        let generator = PlanGenerator::new(cabbage_source(), ListedWorkdays::new([date(2026, 2, 3)]));
        let outcome = generator.generate(february(), Some("tester")).await?;

        assert_eq!(outcome.plans.len(), 1);
        let plan = &outcome.plans[0];
        assert_eq!(plan.date, date(2026, 2, 3));
        assert_eq!(plan.year_month, "2026-02");
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].name, "cabbage");
        assert_eq!(plan.items[0].quantity, d("2.0"));
        assert_eq!(plan.total_amount, d("6.00"));
        assert_eq!(plan.creator_id.as_deref(), Some("tester"));
        assert!(
            plan.warnings
                .iter()
                .any(|w| w.reason.text() == "日采总额低于预算下限")
        );
        assert_eq!(outcome.warnings, plan.warnings);
        Ok(())
    }

    #[tokio::test]
    async fn test_generation_is_deterministic_per_date() -> Result<()> {
        let first = PlanGenerator::new(mixed_source(), WeekdayCalendar::new())
            .generate(february(), None)
            .await?;
        let second = PlanGenerator::new(mixed_source(), WeekdayCalendar::new())
            .generate(february(), None)
            .await?;

        assert_eq!(first.plans.len(), 20);
        assert_eq!(first.plans.len(), second.plans.len());
        for (a, b) in first.plans.iter().zip(&second.plans) {
            assert_eq!(a.date, b.date);
            assert_eq!(a.items, b.items);
            assert_eq!(a.total_amount, b.total_amount);
        }
        assert_eq!(first.warnings, second.warnings);
        Ok(())
    }

    #[tokio::test]
    async fn test_generated_items_respect_product_bounds() -> Result<()> {
        let source = mixed_source();
        let catalog: HashMap<i64, Product> =
            source.products.iter().map(|p| (p.id, p.clone())).collect();
        let outcome = PlanGenerator::new(source, WeekdayCalendar::new())
            .generate(february(), None)
            .await?;

        let mut periodic_days: HashMap<i64, usize> = HashMap::new();
        for plan in &outcome.plans {
            assert_eq!(plan.total_amount, items_total(&plan.items));
            assert!(plan.date.weekday().num_days_from_monday() < 5);
            let mut seen = HashSet::new();
            for item in &plan.items {
                assert!(seen.insert(item.product_id), "product repeated within a day");
                let product = &catalog[&item.product_id];
                let range = product.quantity_range.unwrap();
                let volatility = product.volatility.unwrap();
                let step = quantity_step_for_unit(&product.unit);
                assert!(item.quantity >= range.min && item.quantity <= range.max);
                assert_eq!(step_quantize(item.quantity, step), item.quantity);
                assert!(item.price >= d("0.01"));
                assert!(item.price >= round_to(product.base_price * (Decimal::ONE - volatility), 2));
                assert!(item.price <= round_to(product.base_price * (Decimal::ONE + volatility), 2));
                assert_eq!(item.amount, round_to(item.price * item.quantity, 2));
                if product.category_id == 3 {
                    *periodic_days.entry(item.product_id).or_default() += 1;
                }
            }
        }
        // Without history every periodic product is placed at most once per month
        assert!(periodic_days.values().all(|count| *count == 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_feasible_days_land_near_budget() -> Result<()> {
        let outcome = PlanGenerator::new(mixed_source(), WeekdayCalendar::new())
            .generate(february(), None)
            .await?;
        for plan in &outcome.plans {
            let daily: Decimal = plan
                .items
                .iter()
                .filter(|i| i.category_id != Some(3))
                .map(|i| i.amount)
                .sum();
            assert!(daily >= d("299") && daily <= d("501"), "{} daily total {daily}", plan.date);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_history_schedules_periodic_item() -> Result<()> {
        let mut source = mixed_source();
        // One cycle of 7 ± 2 days after 2026-02-02 stays inside February
        source.history.insert(11, date(2026, 2, 2));
        let outcome = PlanGenerator::new(source, WeekdayCalendar::new())
            .generate(february(), None)
            .await?;
        let days: Vec<NaiveDate> = outcome
            .plans
            .iter()
            .filter(|p| p.items.iter().any(|i| i.product_id == 11))
            .map(|p| p.date)
            .collect();
        assert_eq!(days.len(), 1);
        assert!(days[0] >= date(2026, 2, 6) && days[0] <= date(2026, 2, 13));
        Ok(())
    }

    #[tokio::test]
    async fn test_category_without_rule_is_fatal() {
        let mut source = cabbage_source();
        source.categories[0].mode = PurchaseMode::Unset;
        let result = PlanGenerator::new(source, WeekdayCalendar::new())
            .generate(february(), None)
            .await;
        match result {
            Err(err @ Error::CategoriesWithoutRules { .. }) => {
                assert_eq!(err.to_string(), "存在未配置规则的品类");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_catalog_is_fatal() {
        let mut source = cabbage_source();
        source.products.clear();
        let result = PlanGenerator::new(source, WeekdayCalendar::new())
            .generate(february(), None)
            .await;
        assert!(matches!(result, Err(Error::EmptyCatalog)));
    }

    #[tokio::test]
    async fn test_budget_preconditions_are_fatal() {
        let mut missing = cabbage_source();
        missing.budget = None;
        let result = PlanGenerator::new(missing, WeekdayCalendar::new())
            .generate(february(), None)
            .await;
        assert!(matches!(result, Err(Error::BudgetRangeMissing)));

        let mut inverted = cabbage_source();
        inverted.budget = Some(BudgetRange {
            min: d("300"),
            max: d("100"),
        });
        let result = PlanGenerator::new(inverted, WeekdayCalendar::new())
            .generate(february(), None)
            .await;
        assert!(matches!(result, Err(Error::BudgetRangeInvalid { .. })));
    }

    #[tokio::test]
    async fn test_missing_volatility_is_fatal() {
        let mut source = cabbage_source();
        source.products[0].volatility = None;
        let result = PlanGenerator::new(source, WeekdayCalendar::new())
            .generate(february(), None)
            .await;
        assert!(matches!(result, Err(Error::MissingVolatility { .. })));
    }

    #[tokio::test]
    async fn test_month_without_workdays_is_skipped() -> Result<()> {
        let outcome = PlanGenerator::new(cabbage_source(), ListedWorkdays::default())
            .generate(february(), None)
            .await?;
        assert!(outcome.plans.is_empty());
        assert!(outcome.warnings.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_small_pool_warns_and_continues() -> Result<()> {
        let mut source = cabbage_source();
        source.categories[0].mode = PurchaseMode::daily(CountRange::new(2, 3).unwrap());
        let outcome = PlanGenerator::new(source, ListedWorkdays::new([date(2026, 2, 3)]))
            .generate(february(), None)
            .await?;
        assert_eq!(outcome.plans.len(), 1);
        assert!(outcome.warnings.iter().any(|w| matches!(
            w.reason,
            WarningReason::InsufficientCandidates {
                available: 1,
                min_required: 2
            }
        )));
        Ok(())
    }

    #[tokio::test]
    async fn test_category_without_products_warns_no_candidates() -> Result<()> {
        let mut source = cabbage_source();
        let fruit = category(2, "fruit", PurchaseMode::daily(CountRange::new(1, 1).unwrap()));
        source.categories.push(fruit);
        let outcome = PlanGenerator::new(source, ListedWorkdays::new([date(2026, 2, 3)]))
            .generate(february(), None)
            .await?;

        assert_eq!(outcome.plans.len(), 1);
        assert_eq!(outcome.plans[0].items.len(), 1);
        let warning = outcome
            .warnings
            .iter()
            .find(|w| w.reason == WarningReason::NoCandidates)
            .unwrap();
        assert_eq!(warning.date, date(2026, 2, 3));
        assert_eq!(warning.category_id, Some(2));
        assert_eq!(warning.category_name.as_deref(), Some("fruit"));
        assert_eq!(warning.reason.text(), "品类无可用产品");
        Ok(())
    }

    #[tokio::test]
    async fn test_unaffordable_minimum_warns_with_costs() -> Result<()> {
        let mut source = cabbage_source();
        let vegetables = source.categories[0].clone();
        source.products = vec![product(1, &vegetables, "个", "100", "0", ("5", "5"))];
        source.budget = Some(BudgetRange::new(d("10"), d("20")).unwrap());
        let outcome = PlanGenerator::new(source, ListedWorkdays::new([date(2026, 2, 3)]))
            .generate(february(), None)
            .await?;

        let plan = &outcome.plans[0];
        assert_eq!(plan.items[0].quantity, d("5"));
        assert_eq!(plan.total_amount, d("500.00"));

        let min_cost = outcome
            .warnings
            .iter()
            .find(|w| matches!(w.reason, WarningReason::MinCostAboveBudget { .. }))
            .unwrap();
        assert_eq!(min_cost.category_id, Some(1));
        assert_eq!(
            min_cost.reason,
            WarningReason::MinCostAboveBudget {
                min_cost: d("500.00"),
                budget_max: d("20"),
            }
        );

        let above = outcome
            .warnings
            .iter()
            .find(|w| matches!(w.reason, WarningReason::DailyTotalAboveMax { .. }))
            .unwrap();
        assert_eq!(above.category_id, None);
        assert_eq!(
            above.reason,
            WarningReason::DailyTotalAboveMax {
                total_amount: d("500.00"),
                budget_max: d("20"),
            }
        );
        assert_eq!(above.reason.text(), "日采总额高于预算上限");
        assert!(
            !outcome
                .warnings
                .iter()
                .any(|w| matches!(w.reason, WarningReason::DailyTotalBelowMin { .. }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_money_precision_is_bounded() -> Result<()> {
        let result = PlanGenerator::new(cabbage_source(), WeekdayCalendar::new()).with_money_precision(3);
        assert!(matches!(
            result,
            Err(Error::InvalidPrecision {
                precision: 3,
                max: 2
            })
        ));

        let outcome = PlanGenerator::new(cabbage_source(), ListedWorkdays::new([date(2026, 2, 3)]))
            .with_money_precision(0)?
            .generate(february(), None)
            .await?;
        let plan = &outcome.plans[0];
        assert!(plan.items.iter().all(|item| item.amount.fract().is_zero()));
        assert_eq!(plan.total_amount, d("6"));
        Ok(())
    }
}
