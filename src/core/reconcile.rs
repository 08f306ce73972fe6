//! Daily budget reconciliation.
//!
//! Daily items start at their minimum quantities. The reconciler first adds products while
//! the daily total is short of the day's target, then moves quantities greedily towards
//! the target within each item's range and step. Periodic items never pass through here.

use crate::{
    core::{
        item::build_item_at_min,
        model::{Category, Product, WorkingItem},
        numeric::{ceil_to_step, floor_to_step, round_to, step_precision, step_quantize},
    },
    errors::Result,
};
use rand::{Rng, seq::SliceRandom};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Products added at most while topping up a short day.
pub const MAX_TOP_UP_TRIES: usize = 5;
/// Greedy passes over the adjustable items.
pub const MAX_ADJUST_ROUNDS: usize = 5;

fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Selection state of one daily category on one workday.
#[derive(Debug, Clone)]
pub struct DailyPool<'a> {
    /// The category
    pub category: &'a Category,
    /// Products that were eligible when the day started
    pub candidates: Vec<&'a Product>,
    /// Most products the category may hold today
    pub limit: usize,
    /// Products picked so far
    pub selected: usize,
}

impl DailyPool<'_> {
    fn has_room(&self) -> bool {
        self.selected < self.limit
    }
}

/// Rounded sum of item amounts.
#[must_use]
pub fn working_total(items: &[WorkingItem], precision: u32) -> Decimal {
    round_to(items.iter().map(|item| item.amount).sum(), precision)
}

/// Adds minimum-quantity items from categories with room left until the daily total
/// reaches `target`, no category has room, or the attempts run out.
///
/// # Errors
/// Propagates item build failures for misconfigured products.
pub fn top_up<R: Rng + ?Sized>(
    pools: &mut [DailyPool<'_>],
    used_products: &mut HashSet<i64>,
    items: &mut Vec<WorkingItem>,
    target: Decimal,
    precision: u32,
    rng: &mut R,
) -> Result<()> {
    for _ in 0..MAX_TOP_UP_TRIES {
        if working_total(items, precision) >= target {
            break;
        }
        let eligible: Vec<usize> = pools
            .iter()
            .enumerate()
            .filter(|(_, pool)| pool.has_room())
            .map(|(idx, _)| idx)
            .collect();
        let Some(&pool_idx) = eligible.choose(rng) else {
            break;
        };
        let pool = &mut pools[pool_idx];
        let remaining: Vec<&Product> = pool
            .candidates
            .iter()
            .copied()
            .filter(|p| !used_products.contains(&p.id))
            .collect();
        let Some(product) = remaining.choose(rng).copied() else {
            pool.limit = pool.selected;
            continue;
        };

        let item = build_item_at_min(product, pool.category, precision, rng)?;
        tracing::trace!(product = %item.name, amount = %item.amount, "top-up item added");
        used_products.insert(product.id);
        pool.selected += 1;
        items.push(item);
    }
    Ok(())
}

/// Quantity interval an item may move within, snapped onto its step grid.
fn step_bounds(item: &WorkingItem) -> Option<(Decimal, Decimal)> {
    let low = ceil_to_step(item.qty_min, item.qty_step);
    let high = floor_to_step(item.qty_max, item.qty_step);
    (low <= high).then_some((low, high))
}

fn set_quantity(item: &mut WorkingItem, quantity: Decimal, precision: u32) {
    item.quantity = round_to(quantity, step_precision(item.qty_step));
    item.amount = round_to(item.price * item.quantity, precision);
}

/// Moves item quantities so the items' total approaches `target`.
///
/// Each round raises spend through the cheapest items first, or cuts it through the most
/// expensive ones. A final single-item nudge is applied only if it keeps the quantity in
/// range.
pub fn adjust_to_budget(items: &mut [WorkingItem], target: Decimal, precision: u32) {
    if items.is_empty() {
        return;
    }
    let mut order: Vec<usize> = (0..items.len()).collect();

    for _ in 0..MAX_ADJUST_ROUNDS {
        let mut delta = target - working_total(items, precision);
        if delta.abs() < tolerance() {
            return;
        }
        if delta > Decimal::ZERO {
            order.sort_by(|a, b| items[*a].price.cmp(&items[*b].price));
        } else {
            order.sort_by(|a, b| items[*b].price.cmp(&items[*a].price));
        }

        for &idx in &order {
            if delta.abs() < tolerance() {
                break;
            }
            let item = &mut items[idx];
            if item.price <= Decimal::ZERO {
                continue;
            }
            let Some((low, high)) = step_bounds(item) else {
                continue;
            };
            let wanted = item.quantity + delta / item.price;
            let quantity = step_quantize(wanted, item.qty_step).clamp(low, high);
            if quantity == item.quantity {
                continue;
            }
            let before = item.amount;
            set_quantity(item, quantity, precision);
            delta -= item.amount - before;
        }
    }

    let delta = target - working_total(items, precision);
    if delta.abs() < tolerance() {
        return;
    }
    for &idx in &order {
        let item = &mut items[idx];
        if item.price <= Decimal::ZERO {
            continue;
        }
        let quantity = round_to(
            step_quantize(item.quantity + delta / item.price, item.qty_step),
            step_precision(item.qty_step),
        );
        if quantity == item.quantity || quantity < item.qty_min || quantity > item.qty_max {
            continue;
        }
        set_quantity(item, quantity, precision);
        break;
    }
}
