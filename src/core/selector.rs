//! Budget-aware product selection for daily categories.
//!
//! Selection is pessimistic: each candidate subset is priced at its minimum feasible cost
//! (minimum quantity at the highest volatility-adjusted price). Subsets over the daily
//! ceiling are nudged towards cheaper products by swapping, and the best subset seen is
//! used even when none fits.

use crate::core::{
    item::{estimate_min_cost, normalized_base_price},
    model::{CountRange, Product},
};
use rand::{Rng, seq::SliceRandom};
use rust_decimal::Decimal;

/// Swap attempts per sampled subset.
pub const MAX_MIN_COST_SWAP_TRIES: usize = 5;
/// Fresh samples drawn per category and day.
pub const MAX_SELECTION_RETRIES: usize = 5;

/// A chosen subset with its minimum feasible cost.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// Chosen products
    pub products: Vec<&'a Product>,
    /// Sum of the products' minimum feasible costs
    pub min_cost: Decimal,
}

/// How many products to pick for a category on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPlan {
    /// Number to select now
    pub desired: usize,
    /// Most products the category may hold that day
    pub limit: usize,
    /// Whether the pool cannot meet the configured minimum
    pub short_of_minimum: bool,
}

/// Draws a count uniformly from `[max(1, min), max]`.
pub fn pick_items_count<R: Rng + ?Sized>(range: CountRange, rng: &mut R) -> usize {
    let low = range.min.max(1);
    let high = range.max.max(low);
    usize::try_from(rng.gen_range(low..=high)).unwrap_or(usize::MAX)
}

/// Decides how many of `available` candidates to pick under `range`.
pub fn plan_count<R: Rng + ?Sized>(range: CountRange, available: usize, rng: &mut R) -> CountPlan {
    let min_count = usize::try_from(range.min).unwrap_or(usize::MAX);
    let max_count = usize::try_from(range.max).unwrap_or(usize::MAX);
    let drawn = pick_items_count(range, rng);
    let limit = max_count.max(min_count).min(available);
    CountPlan {
        desired: drawn.max(min_count).min(limit),
        limit,
        short_of_minimum: available < min_count,
    }
}

/// Sum of minimum feasible costs.
#[must_use]
pub fn min_cost_total(products: &[&Product], precision: u32) -> Decimal {
    products
        .iter()
        .map(|product| estimate_min_cost(product, precision))
        .sum()
}

fn sample<'a, R: Rng + ?Sized>(
    candidates: &[&'a Product],
    desired: usize,
    rng: &mut R,
) -> Vec<&'a Product> {
    if desired == 0 || candidates.is_empty() {
        return Vec::new();
    }
    if candidates.len() <= desired {
        return candidates.to_vec();
    }
    candidates.choose_multiple(rng, desired).copied().collect()
}

/// Replaces the priciest chosen product with cheaper unchosen candidates, keeping a swap
/// only when it lowers the minimum cost. Returns early once the cost fits `budget_max`.
fn lower_cost_by_swapping<'a, R: Rng + ?Sized>(
    chosen: Vec<&'a Product>,
    candidates: &[&'a Product],
    budget_max: Decimal,
    precision: u32,
    rng: &mut R,
) -> Selection<'a> {
    let mut best = Selection {
        min_cost: min_cost_total(&chosen, precision),
        products: chosen,
    };
    if best.products.is_empty() || best.min_cost <= budget_max {
        return best;
    }

    for _ in 0..MAX_MIN_COST_SWAP_TRIES {
        let Some((priciest_idx, priciest)) = best
            .products
            .iter()
            .enumerate()
            .max_by_key(|(_, p)| normalized_base_price(p))
            .map(|(idx, p)| (idx, *p))
        else {
            break;
        };
        let priciest_price = normalized_base_price(priciest);
        let cheaper: Vec<&Product> = candidates
            .iter()
            .copied()
            .filter(|c| {
                normalized_base_price(c) < priciest_price
                    && !best.products.iter().any(|chosen| chosen.id == c.id)
            })
            .collect();
        let Some(replacement) = cheaper.choose(rng).copied() else {
            break;
        };

        let mut swapped = best.products.clone();
        swapped[priciest_idx] = replacement;
        let swapped_cost = min_cost_total(&swapped, precision);
        if swapped_cost < best.min_cost {
            best = Selection {
                products: swapped,
                min_cost: swapped_cost,
            };
            if best.min_cost <= budget_max {
                break;
            }
        }
    }
    best
}

/// Samples `desired` candidates, retrying to find a subset whose minimum feasible cost fits
/// `budget_max`. Returns the cheapest subset seen; the caller warns when it still exceeds
/// the ceiling.
pub fn select_within_budget<'a, R: Rng + ?Sized>(
    candidates: &[&'a Product],
    desired: usize,
    budget_max: Decimal,
    precision: u32,
    rng: &mut R,
) -> Selection<'a> {
    let mut best: Option<Selection<'a>> = None;
    for _ in 0..MAX_SELECTION_RETRIES {
        let chosen = sample(candidates, desired, rng);
        let selection = lower_cost_by_swapping(chosen, candidates, budget_max, precision, rng);
        let fits = selection.min_cost <= budget_max;
        if best.as_ref().is_none_or(|b| selection.min_cost < b.min_cost) {
            best = Some(selection);
        }
        if fits {
            break;
        }
    }
    best.unwrap_or(Selection {
        products: Vec::new(),
        min_cost: Decimal::ZERO,
    })
}
