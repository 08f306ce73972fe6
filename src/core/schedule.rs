//! Periodic purchase scheduling.
//!
//! Each periodic product lands on at most one workday per month: one cycle (plus jitter)
//! after its last purchase, or on a random workday when it was never bought. Dates that
//! fall outside the month are left for that month's own run.

use crate::{
    core::{
        item::build_item,
        model::{Category, Product, PurchaseMode, WorkingItem},
        selector::pick_items_count,
        workdays::{YearMonth, shift_to_next_workday},
    },
    errors::Result,
};
use chrono::{Days, NaiveDate};
use rand::{Rng, seq::SliceRandom};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Products planned per workday.
pub type PeriodicSchedule<'a> = BTreeMap<NaiveDate, Vec<&'a Product>>;

fn jittered_target<R: Rng + ?Sized>(
    last: NaiveDate,
    cycle_days: u32,
    float_days: u32,
    rng: &mut R,
) -> Option<NaiveDate> {
    let float = i64::from(float_days);
    let offset = i64::from(cycle_days) + rng.gen_range(-float..=float);
    if offset >= 0 {
        last.checked_add_days(Days::new(offset.unsigned_abs()))
    } else {
        last.checked_sub_days(Days::new(offset.unsigned_abs()))
    }
}

/// Places every product of the periodic `groups` on the month's workdays.
///
/// `histories` maps product ids to their most recent purchase date.
pub fn build_periodic_schedule<'a, R: Rng + ?Sized>(
    groups: &[(&'a Category, Vec<&'a Product>)],
    histories: &HashMap<i64, NaiveDate>,
    workdays: &[NaiveDate],
    month: YearMonth,
    rng: &mut R,
) -> PeriodicSchedule<'a> {
    let mut schedule = PeriodicSchedule::new();
    if workdays.is_empty() {
        return schedule;
    }

    for (category, products) in groups {
        let PurchaseMode::Periodic {
            cycle_days,
            float_days,
            ..
        } = category.mode
        else {
            continue;
        };
        for product in products {
            let target = match histories.get(&product.id) {
                Some(last) => jittered_target(*last, cycle_days, float_days, rng),
                None => workdays.choose(rng).copied(),
            };
            let Some(target) = target.filter(|t| month.contains(*t)) else {
                continue;
            };
            let Some(day) = shift_to_next_workday(target, workdays) else {
                continue;
            };
            schedule.entry(day).or_default().push(*product);
        }
    }
    schedule
}

/// Builds the periodic items of one workday.
///
/// Per category, a random subset bounded by the category's item count is bought at a
/// random quantity. Chosen products are marked as used for the day.
///
/// # Errors
/// Propagates item build failures for misconfigured products.
pub fn place_periodic_items<R: Rng + ?Sized>(
    scheduled: &[&Product],
    categories: &BTreeMap<i64, &Category>,
    precision: u32,
    used_products: &mut HashSet<i64>,
    rng: &mut R,
) -> Result<Vec<WorkingItem>> {
    let mut by_category: BTreeMap<i64, Vec<&Product>> = BTreeMap::new();
    for product in scheduled {
        by_category
            .entry(product.category_id)
            .or_default()
            .push(*product);
    }

    let mut items = Vec::new();
    for (category_id, products) in by_category {
        let Some(category) = categories.get(&category_id) else {
            continue;
        };
        let count = category
            .mode
            .items()
            .map_or(products.len(), |range| pick_items_count(range, rng))
            .min(products.len());
        let chosen: Vec<&Product> = if count >= products.len() {
            products
        } else {
            products.choose_multiple(rng, count).copied().collect()
        };
        for product in chosen {
            let item = build_item(product, category, precision, None, rng)?;
            used_products.insert(product.id);
            items.push(item);
        }
    }
    Ok(items)
}
