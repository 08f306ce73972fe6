//! Planner settings kept in the `system_state` key-value table.

use crate::{
    core::model::BudgetRange,
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, Set, prelude::*};
use tracing::info;

/// Key under which the daily budget range is stored.
pub const DAILY_BUDGET_RANGE_KEY: &str = "daily_budget_range";

async fn get_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?
        .map(|state| state.value))
}

async fn set_value<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }
    Ok(())
}

/// Reads the configured daily budget range.
///
/// The stored range is returned as-is; an inverted range is reported by
/// [`BudgetRange::validate`] when generation starts.
///
/// # Errors
/// Returns an error if the query fails or the stored value is not a budget range.
pub async fn get_daily_budget_range<C>(db: &C) -> Result<Option<BudgetRange>>
where
    C: ConnectionTrait,
{
    get_value(db, DAILY_BUDGET_RANGE_KEY)
        .await?
        .map(|raw| serde_json::from_str(&raw).map_err(Into::into))
        .transpose()
}

/// Stores the daily budget range.
///
/// # Errors
/// Returns [`crate::errors::Error::BudgetRangeInvalid`] when `min > max`, or an error if
/// the write fails.
pub async fn set_daily_budget_range<C>(db: &C, range: BudgetRange) -> Result<()>
where
    C: ConnectionTrait,
{
    range.validate()?;
    set_value(db, DAILY_BUDGET_RANGE_KEY, serde_json::to_string(&range)?).await?;
    info!(min = %range.min, max = %range.max, "daily budget range updated");
    Ok(())
}
