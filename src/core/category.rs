//! Category business logic - Creating categories and maintaining their purchasing rules.
//!
//! Rules are passed around as [`PurchaseMode`] values, whose constructors already enforce
//! the count and cycle invariants, and are flattened into nullable columns for storage.
//! Reading a row back turns any partially configured rule into [`PurchaseMode::Unset`].

use crate::{
    core::model::{Category, CountRange, PurchaseMode},
    entities::{Category as CategoryEntity, Product, category, product},
    errors::{Error, Result},
};
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use tracing::{info, instrument};

/// Flattened rule columns: mode, items min/max, cycle, float.
type RuleColumns = (
    Option<String>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
);

fn to_column(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidRule {
        message: format!("{field} is too large: {value}"),
    })
}

fn rule_columns(mode: PurchaseMode) -> Result<RuleColumns> {
    Ok(match mode {
        PurchaseMode::Unset => (None, None, None, None, None),
        PurchaseMode::Daily { items } => (
            Some("daily".to_string()),
            Some(to_column(items.min, "items_min")?),
            Some(to_column(items.max, "items_max")?),
            None,
            None,
        ),
        PurchaseMode::Periodic {
            items,
            cycle_days,
            float_days,
        } => (
            Some("periodic".to_string()),
            Some(to_column(items.min, "items_min")?),
            Some(to_column(items.max, "items_max")?),
            Some(to_column(cycle_days, "cycle_days")?),
            Some(to_column(float_days, "float_days")?),
        ),
    })
}

fn stored_u32(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// Reads the rule stored on a category row.
#[must_use]
pub fn stored_mode(model: &category::Model) -> PurchaseMode {
    let items = stored_u32(model.items_min)
        .zip(stored_u32(model.items_max))
        .and_then(|(min, max)| CountRange::new(min, max).ok());
    let Some(items) = items else {
        return PurchaseMode::Unset;
    };
    match model.purchase_mode.as_deref() {
        Some("daily") => PurchaseMode::daily(items),
        Some("periodic") => stored_u32(model.cycle_days)
            .zip(stored_u32(model.float_days))
            .and_then(|(cycle, float)| PurchaseMode::periodic(items, cycle, float).ok())
            .unwrap_or(PurchaseMode::Unset),
        _ => PurchaseMode::Unset,
    }
}

/// Converts a stored row into the planning model.
#[must_use]
pub fn to_domain(model: &category::Model) -> Category {
    Category {
        id: model.id,
        name: model.name.clone(),
        is_active: model.is_active,
        mode: stored_mode(model),
    }
}

/// Retrieves every category ordered by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_categories<C: ConnectionTrait>(db: &C) -> Result<Vec<category::Model>> {
    CategoryEntity::find()
        .order_by_asc(category::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a category by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Option<category::Model>> {
    CategoryEntity::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its exact name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_category_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<category::Model>> {
    CategoryEntity::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn ensure_unique_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except_id: Option<i64>,
) -> Result<()> {
    if let Some(existing) = get_category_by_name(db, name).await? {
        if Some(existing.id) != except_id {
            return Err(Error::DuplicateCategory {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: "Category name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Creates an active category with the given rule.
///
/// # Errors
/// Returns an error if the name is empty or already taken, a rule value does not fit the
/// column, or the insert fails.
#[instrument(skip(db))]
pub async fn create_category<C: ConnectionTrait>(
    db: &C,
    name: &str,
    mode: PurchaseMode,
) -> Result<category::Model> {
    let name = validate_name(name)?;
    let (purchase_mode, items_min, items_max, cycle_days, float_days) = rule_columns(mode)?;
    ensure_unique_name(db, &name, None).await?;
    let now = chrono::Utc::now().naive_utc();

    let category = category::ActiveModel {
        name: Set(name),
        is_active: Set(true),
        purchase_mode: Set(purchase_mode),
        items_min: Set(items_min),
        items_max: Set(items_max),
        cycle_days: Set(cycle_days),
        float_days: Set(float_days),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = category.insert(db).await?;
    info!(category_id = model.id, name = %model.name, "category created");
    Ok(model)
}

async fn find_existing(db: &DatabaseConnection, category_id: i64) -> Result<category::Model> {
    CategoryEntity::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            name: category_id.to_string(),
        })
}

/// Replaces the purchasing rule of a category.
///
/// # Errors
/// Returns an error if the category does not exist or the update fails.
#[instrument(skip(db))]
pub async fn update_category_rule(
    db: &DatabaseConnection,
    category_id: i64,
    mode: PurchaseMode,
) -> Result<category::Model> {
    let (purchase_mode, items_min, items_max, cycle_days, float_days) = rule_columns(mode)?;
    let mut category: category::ActiveModel = find_existing(db, category_id).await?.into();

    category.purchase_mode = Set(purchase_mode);
    category.items_min = Set(items_min);
    category.items_max = Set(items_max);
    category.cycle_days = Set(cycle_days);
    category.float_days = Set(float_days);
    category.updated_at = Set(chrono::Utc::now().naive_utc());

    category.update(db).await.map_err(Into::into)
}

/// Renames a category and refreshes the name snapshot on its products.
///
/// # Errors
/// Returns an error if the name is empty, the category does not exist, or a write fails.
#[instrument(skip(db))]
pub async fn rename_category(
    db: &DatabaseConnection,
    category_id: i64,
    new_name: &str,
) -> Result<category::Model> {
    let new_name = validate_name(new_name)?;
    let existing = find_existing(db, category_id).await?;
    ensure_unique_name(db, &new_name, Some(category_id)).await?;

    let txn = db.begin().await?;
    let mut category: category::ActiveModel = existing.into();
    category.name = Set(new_name.clone());
    category.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = category.update(&txn).await?;

    Product::update_many()
        .col_expr(product::Column::CategoryName, Expr::value(new_name))
        .filter(product::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    Ok(updated)
}

/// Result of deactivating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deactivation {
    /// The category after the change
    pub category: category::Model,
    /// Products moved to the transfer target
    pub transferred: u64,
}

/// Re-activates a category. Activating an active category changes nothing.
///
/// # Errors
/// Returns an error if the category does not exist or the update fails.
pub async fn activate_category(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<category::Model> {
    let existing = find_existing(db, category_id).await?;
    if existing.is_active {
        return Ok(existing);
    }
    let mut category: category::ActiveModel = existing.into();
    category.is_active = Set(true);
    category.updated_at = Set(chrono::Utc::now().naive_utc());
    category.update(db).await.map_err(Into::into)
}

/// Deactivates a category, optionally moving its products to `transfer_to` first.
///
/// A category that still holds active products is only deactivated with a transfer
/// target, so no product silently drops out of generation. Deactivating an inactive
/// category changes nothing.
///
/// # Errors
/// Returns an error if:
/// - Either category does not exist
/// - `transfer_to` is the category itself or an inactive category
/// - Active products remain and no transfer target was given
/// - A write fails
#[instrument(skip(db))]
pub async fn deactivate_category(
    db: &DatabaseConnection,
    category_id: i64,
    transfer_to: Option<i64>,
) -> Result<Deactivation> {
    let existing = find_existing(db, category_id).await?;
    if !existing.is_active {
        return Ok(Deactivation {
            category: existing,
            transferred: 0,
        });
    }
    if transfer_to == Some(category_id) {
        return Err(Error::TransferToSameCategory { category_id });
    }
    let target = match transfer_to {
        Some(target_id) => {
            let target = find_existing(db, target_id).await?;
            if !target.is_active {
                return Err(Error::TransferTargetInactive {
                    category_id: target_id,
                });
            }
            Some(target)
        }
        None => None,
    };

    let product_count = Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .filter(product::Column::IsDeleted.eq(false))
        .count(db)
        .await?;
    if product_count > 0 && target.is_none() {
        return Err(Error::CategoryHasProducts {
            category_id,
            product_count,
        });
    }

    let txn = db.begin().await?;
    let transferred = match &target {
        Some(target) => {
            Product::update_many()
                .col_expr(product::Column::CategoryId, Expr::value(target.id))
                .col_expr(product::Column::CategoryName, Expr::value(target.name.clone()))
                .filter(product::Column::CategoryId.eq(category_id))
                .exec(&txn)
                .await?
                .rows_affected
        }
        None => 0,
    };
    let mut category: category::ActiveModel = existing.into();
    category.is_active = Set(false);
    category.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = category.update(&txn).await?;
    txn.commit().await?;

    info!(category_id, transferred, "category deactivated");
    Ok(Deactivation {
        category: updated,
        transferred,
    })
}
