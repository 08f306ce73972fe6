//! Regeneration of stored plans for a month range.
//!
//! Months that already hold plans are reported as conflicts unless `force` is set. With
//! `force`, the new plans are generated first (ignoring the history of the months being
//! replaced), then the old months are deleted and the new plans inserted in one
//! transaction.

use crate::{
    core::{
        generator::PlanGenerator,
        model::{DayPlan, Warning},
        plan::{delete_months, existing_months, save_plans},
        store::DbStore,
        workdays::{MonthRange, WorkdayProvider},
    },
    errors::Result,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument, warn};

/// Result of a regeneration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerateOutcome {
    /// Months that already have plans; nothing was written
    Conflict {
        /// Conflicting `YYYY-MM` keys, sorted
        months: Vec<String>,
    },
    /// Plans were generated and stored
    Generated {
        /// Stored plans ordered by date
        plans: Vec<DayPlan>,
        /// Warnings raised during generation
        warnings: Vec<Warning>,
        /// Months whose previous plans were deleted
        replaced_months: Vec<String>,
    },
}

/// Generates and stores plans for `range`.
///
/// # Errors
/// Returns any fatal generation error (nothing is written in that case) or a database
/// error from the replacement transaction.
#[instrument(skip(db, workdays), fields(start = %range.start, end = %range.end))]
pub async fn regenerate<W>(
    db: &DatabaseConnection,
    workdays: &W,
    range: MonthRange,
    creator_id: Option<&str>,
    force: bool,
) -> Result<RegenerateOutcome>
where
    W: WorkdayProvider,
{
    let existing = existing_months(db, &range.keys()).await?;
    if !existing.is_empty() && !force {
        warn!(months = ?existing, "months already planned");
        return Ok(RegenerateOutcome::Conflict { months: existing });
    }

    let store = DbStore::new(db).excluding(existing.clone());
    let outcome = PlanGenerator::new(store, workdays)
        .generate(range, creator_id)
        .await?;

    let txn = db.begin().await?;
    delete_months(&txn, &existing).await?;
    save_plans(&txn, &outcome.plans).await?;
    txn.commit().await?;

    info!(
        plans = outcome.plans.len(),
        replaced = existing.len(),
        "plans stored"
    );
    Ok(RegenerateOutcome::Generated {
        plans: outcome.plans,
        warnings: outcome.warnings,
        replaced_months: existing,
    })
}
