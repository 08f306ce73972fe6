//! Unit normalization and quantity step rules.
//!
//! Units are stored under their canonical Chinese label. Splittable units (mass and
//! volume) are purchased in steps of 0.1 with one decimal of precision; every other unit
//! is purchased in whole steps.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;

const SPLITTABLE_UNITS: [&str; 6] = ["克", "千克", "斤", "两", "毫升", "升"];

/// Maps a lookup key (whitespace removed, lowercased) to its canonical unit.
fn canonical_alias(key: &str) -> Option<&'static str> {
    let canonical = match key {
        "公斤" | "千克" | "kg" | "kilogram" | "kilograms" => "千克",
        "公升" | "升" | "l" | "liter" | "liters" | "litre" | "litres" => "升",
        "毫升" | "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => "毫升",
        "克" | "g" | "gram" | "grams" => "克",
        "斤" | "jin" => "斤",
        "两" | "liang" => "两",
        _ => return None,
    };
    Some(canonical)
}

fn lookup_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalizes a unit label to its canonical form.
///
/// Known aliases map to the canonical label. Unknown labels containing Latin letters are
/// rejected; any other unknown label is kept as typed (trimmed).
///
/// # Errors
/// Returns [`Error::InvalidUnit`] for an empty label or an unrecognized Latin label.
pub fn normalize_unit(unit: &str) -> Result<String> {
    let raw = unit.trim();
    if raw.is_empty() {
        return Err(Error::InvalidUnit {
            unit: unit.to_string(),
            reason: "单位不能为空".to_string(),
        });
    }

    if let Some(canonical) = canonical_alias(&lookup_key(raw)) {
        return Ok(canonical.to_string());
    }

    if raw.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidUnit {
            unit: unit.to_string(),
            reason: "单位英文未识别，请使用中文单位".to_string(),
        });
    }

    Ok(raw.to_string())
}

/// Whether purchases in this unit may be fractional.
#[must_use]
pub fn is_splittable_unit(unit: &str) -> bool {
    normalize_unit(unit).is_ok_and(|normalized| SPLITTABLE_UNITS.contains(&normalized.as_str()))
}

/// Quantity granularity for a unit: 0.1 when splittable, otherwise 1.
#[must_use]
pub fn quantity_step_for_unit(unit: &str) -> Decimal {
    if is_splittable_unit(unit) {
        Decimal::new(1, 1)
    } else {
        Decimal::ONE
    }
}

/// Decimal places used for quantities in this unit.
#[must_use]
pub fn quantity_precision_for_unit(unit: &str) -> u32 {
    u32::from(is_splittable_unit(unit))
}

/// Canonical splittable units, sorted.
#[must_use]
pub fn splittable_units() -> Vec<&'static str> {
    let mut units = SPLITTABLE_UNITS.to_vec();
    units.sort_unstable();
    units
}
