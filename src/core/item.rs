//! Line item construction.
//!
//! A line item realizes a product for one day: its price drifts within the product's
//! volatility, its quantity is drawn from the allowed range on the unit's step grid, and
//! its amount is the rounded product of the two.

use crate::{
    core::{
        model::{Category, Product, QuantityRange, WorkingItem},
        numeric::{
            MONEY_PRECISION, ceil_to_step, min_price, random_in_range, random_quantity,
            round_to,
        },
        units::{quantity_precision_for_unit, quantity_step_for_unit},
    },
    errors::{Error, Result},
};
use rand::Rng;
use rust_decimal::Decimal;

/// Digits used when drawing the relative price drift.
const PRICE_FACTOR_PRECISION: u32 = 6;

/// Base price normalized to two decimals with the 0.01 floor.
#[must_use]
pub fn normalized_base_price(product: &Product) -> Decimal {
    clamp_price(product.base_price)
}

fn clamp_price(value: Decimal) -> Decimal {
    let rounded = round_to(value, MONEY_PRECISION);
    rounded.max(min_price())
}

/// Smallest quantity in the range that sits on the step grid, or the range minimum when
/// no step multiple fits.
#[must_use]
pub fn min_feasible_quantity(range: &QuantityRange, step: Decimal) -> Decimal {
    let snapped = ceil_to_step(range.min, step);
    if snapped > range.max { range.min } else { snapped }
}

/// Whether `range` contains at least one multiple of `step`.
#[must_use]
pub fn range_fits_step(range: &QuantityRange, step: Decimal) -> bool {
    ceil_to_step(range.min, step) <= range.max
}

/// Rounds to the unit precision, then keeps the result inside the range.
fn fit_quantity(quantity: Decimal, range: &QuantityRange, quantity_precision: u32) -> Decimal {
    round_to(quantity, quantity_precision).clamp(range.min, range.max)
}

/// Highest price the product can realize under its volatility.
#[must_use]
pub fn max_volatility_price(product: &Product) -> Decimal {
    let volatility = product.volatility.unwrap_or_default();
    clamp_price(normalized_base_price(product) * (Decimal::ONE + volatility))
}

/// Pessimistic cost of buying the product: minimum feasible quantity at its highest
/// price. Products without a quantity range cost nothing here; building them fails later.
#[must_use]
pub fn estimate_min_cost(product: &Product, precision: u32) -> Decimal {
    let Some(range) = product.quantity_range else {
        return Decimal::ZERO;
    };
    let step = quantity_step_for_unit(&product.unit);
    round_to(
        min_feasible_quantity(&range, step) * max_volatility_price(product),
        precision,
    )
}

/// Builds one working item for `product`.
///
/// With `quantity_override` the quantity is taken as given (rounded to the unit's
/// precision); otherwise it is drawn from the product's range.
///
/// # Errors
/// Returns [`Error::MissingVolatility`] or [`Error::MissingQuantityRange`] when the
/// product lacks the configuration needed to price or size it.
pub fn build_item<R: Rng + ?Sized>(
    product: &Product,
    category: &Category,
    precision: u32,
    quantity_override: Option<Decimal>,
    rng: &mut R,
) -> Result<WorkingItem> {
    let volatility = product.volatility.ok_or_else(|| Error::MissingVolatility {
        product: product.name.clone(),
    })?;
    let factor = Decimal::ONE + random_in_range(rng, -volatility, volatility, PRICE_FACTOR_PRECISION);
    let price = clamp_price(normalized_base_price(product) * factor);

    let range = product
        .quantity_range
        .ok_or_else(|| Error::MissingQuantityRange {
            product: product.name.clone(),
        })?;
    let step = quantity_step_for_unit(&product.unit);
    let quantity_precision = quantity_precision_for_unit(&product.unit);
    let raw_quantity = quantity_override
        .unwrap_or_else(|| random_quantity(rng, range.min, range.max, step, quantity_precision));
    let mut quantity = fit_quantity(raw_quantity, &range, quantity_precision);
    let mut amount = round_to(price * quantity, precision);

    // At whole-unit money precision every line must show at least 1
    if precision == 0 && amount < Decimal::ONE && price > Decimal::ZERO {
        let needed = ceil_to_step(Decimal::ONE / price, step).min(range.max);
        quantity = fit_quantity(needed, &range, quantity_precision);
        amount = round_to(price * quantity, precision);
    }

    Ok(WorkingItem {
        product_id: product.id,
        category_id: category.id,
        category_name: category.name.clone(),
        name: product.name.clone(),
        unit: product.unit.clone(),
        price,
        quantity,
        amount,
        qty_min: range.min,
        qty_max: range.max,
        qty_step: step,
    })
}

/// Builds `product` at its minimum feasible quantity.
///
/// # Errors
/// Same conditions as [`build_item`].
pub fn build_item_at_min<R: Rng + ?Sized>(
    product: &Product,
    category: &Category,
    precision: u32,
    rng: &mut R,
) -> Result<WorkingItem> {
    let range = product
        .quantity_range
        .ok_or_else(|| Error::MissingQuantityRange {
            product: product.name.clone(),
        })?;
    let min_quantity = min_feasible_quantity(&range, quantity_step_for_unit(&product.unit));
    build_item(product, category, precision, Some(min_quantity), rng)
}
