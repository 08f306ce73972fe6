//! Product business logic - Handles all product-related operations.
//!
//! Products carry the pricing and quantity configuration the generator needs. Every write
//! validates the draft first (unit label, price floor, volatility bounds, quantity range,
//! unique name among active products) so invalid rows never reach the table. Decimal
//! fields are stored as text and parsed back into [`Decimal`] when converting to the
//! planning model.

use crate::{
    core::{
        item::range_fits_step,
        model::{Product as PlanProduct, QuantityRange},
        numeric::{MONEY_PRECISION, min_price, parse_stored, parse_stored_opt, round_to},
        units::{normalize_unit, quantity_step_for_unit},
    },
    entities::{Category, Product, product},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductDraft {
    /// Product name
    pub name: String,
    /// Owning category
    pub category_id: i64,
    /// Unit label; aliases are normalized
    pub unit: String,
    /// Reference unit price, at least 0.01
    pub base_price: Decimal,
    /// Relative price drift in [0, 1]
    pub volatility: Option<Decimal>,
    /// Per-item quantity bounds
    pub quantity_range: Option<QuantityRange>,
}

/// A draft that passed validation, ready to be written.
struct ValidDraft {
    name: String,
    unit: String,
    base_price: Decimal,
    volatility: Option<Decimal>,
    quantity_range: Option<QuantityRange>,
}

fn validate_draft(draft: &ProductDraft) -> Result<ValidDraft> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(Error::Config {
            message: "Product name cannot be empty".to_string(),
        });
    }
    let unit = normalize_unit(&draft.unit)?;

    let mut base_price = round_to(draft.base_price, MONEY_PRECISION);
    base_price.rescale(MONEY_PRECISION);
    if base_price < min_price() {
        return Err(Error::InvalidAmount {
            amount: draft.base_price,
        });
    }
    if let Some(volatility) = draft.volatility {
        if volatility < Decimal::ZERO || volatility > Decimal::ONE {
            return Err(Error::InvalidAmount { amount: volatility });
        }
    }
    if let Some(range) = draft.quantity_range {
        // Deserialized ranges bypass the constructor
        QuantityRange::new(range.min, range.max)?;
        if !range_fits_step(&range, quantity_step_for_unit(&unit)) {
            return Err(Error::QuantityRangeOffStep {
                min: range.min,
                max: range.max,
                unit,
            });
        }
    }

    Ok(ValidDraft {
        name: name.to_string(),
        unit,
        base_price,
        volatility: draft.volatility,
        quantity_range: draft.quantity_range,
    })
}

/// Converts a stored row into the planning model.
///
/// # Errors
/// Returns [`Error::InvalidDecimal`] when a stored number cannot be parsed, or
/// [`Error::InvalidAmount`] when the stored quantity range is inverted.
pub fn to_domain(model: &product::Model) -> Result<PlanProduct> {
    let min = parse_stored_opt("quantity_min", model.quantity_min.as_deref())?;
    let max = parse_stored_opt("quantity_max", model.quantity_max.as_deref())?;
    let quantity_range = match (min, max) {
        (Some(min), Some(max)) => Some(QuantityRange::new(min, max)?),
        _ => None,
    };
    Ok(PlanProduct {
        id: model.id,
        name: model.name.clone(),
        category_id: model.category_id,
        category_name: model.category_name.clone(),
        unit: model.unit.clone(),
        base_price: parse_stored("base_price", &model.base_price)?,
        volatility: parse_stored_opt("volatility", model.volatility.as_deref())?,
        quantity_range,
    })
}

/// Retrieves all active (non-deleted) products, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsDeleted.eq(false))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the active products of one category, ordered by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_products_in_category(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .filter(product::Column::IsDeleted.eq(false))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active product by its name, returning None if not found or deleted.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Name.eq(name.trim()))
        .filter(product::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID, deleted or not.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn ensure_unique_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except_id: Option<i64>,
) -> Result<()> {
    if let Some(existing) = get_product_by_name(db, name).await? {
        if Some(existing.id) != except_id {
            return Err(Error::DuplicateProduct {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

async fn category_name<C: ConnectionTrait>(db: &C, category_id: i64) -> Result<String> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|c| c.name)
        .ok_or_else(|| Error::CategoryNotFound {
            name: category_id.to_string(),
        })
}

/// Creates a new product after validating the draft.
///
/// # Errors
/// Returns an error if:
/// - The name is empty, the unit is unknown, the price is below 0.01, the volatility is
///   outside [0, 1], or the quantity range is invalid
/// - The category does not exist
/// - Another active product already has this name
/// - The database insert operation fails
#[instrument(skip(db))]
pub async fn create_product<C: ConnectionTrait>(
    db: &C,
    draft: &ProductDraft,
) -> Result<product::Model> {
    let valid = validate_draft(draft)?;
    let category_name = category_name(db, draft.category_id).await?;
    ensure_unique_name(db, &valid.name, None).await?;

    let now = chrono::Utc::now().naive_utc();
    let product = product::ActiveModel {
        name: Set(valid.name),
        category_id: Set(draft.category_id),
        category_name: Set(category_name),
        unit: Set(valid.unit),
        base_price: Set(valid.base_price.to_string()),
        volatility: Set(valid.volatility.map(|v| v.to_string())),
        quantity_min: Set(valid.quantity_range.map(|r| r.min.to_string())),
        quantity_max: Set(valid.quantity_range.map(|r| r.max.to_string())),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = product.insert(db).await?;
    info!(product_id = model.id, name = %model.name, "product created");
    Ok(model)
}

/// Replaces every editable field of an existing product.
///
/// # Errors
/// Returns an error if:
/// - The draft fails validation (see [`create_product`])
/// - The product does not exist or is already deleted
/// - The category does not exist or another active product has the name
/// - The database update operation fails
#[instrument(skip(db))]
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    draft: &ProductDraft,
) -> Result<product::Model> {
    let valid = validate_draft(draft)?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })?
        .into();

    if *product.is_deleted.as_ref() {
        return Err(Error::ProductNotFound {
            name: product_id.to_string(),
        });
    }
    let category_name = category_name(db, draft.category_id).await?;
    ensure_unique_name(db, &valid.name, Some(product_id)).await?;

    product.name = Set(valid.name);
    product.category_id = Set(draft.category_id);
    product.category_name = Set(category_name);
    product.unit = Set(valid.unit);
    product.base_price = Set(valid.base_price.to_string());
    product.volatility = Set(valid.volatility.map(|v| v.to_string()));
    product.quantity_min = Set(valid.quantity_range.map(|r| r.min.to_string()));
    product.quantity_max = Set(valid.quantity_range.map(|r| r.max.to_string()));
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    product.update(db).await.map_err(Into::into)
}

/// Soft deletes a product by marking it as deleted, preserving plan history.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist or is already deleted
/// - The database update operation fails
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            name: product_id.to_string(),
        })?
        .into();

    if *product.is_deleted.as_ref() {
        return Err(Error::ProductNotFound {
            name: product_id.to_string(),
        });
    }

    product.is_deleted = Set(true);
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    product.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn d(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    fn draft(category_id: i64) -> ProductDraft {
        ProductDraft {
            name: "青菜".to_string(),
            category_id,
            unit: "公斤".to_string(),
            base_price: d("4.5"),
            volatility: Some(d("0.1")),
            quantity_range: Some(QuantityRange::new(d("1"), d("10")).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut empty_name = draft(1);
        empty_name.name = "   ".to_string();
        let result = create_product(&db, &empty_name).await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        let mut bad_unit = draft(1);
        bad_unit.unit = "box".to_string();
        let result = create_product(&db, &bad_unit).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidUnit { .. }));

        let mut cheap = draft(1);
        cheap.base_price = d("0.004");
        let result = create_product(&db, &cheap).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let mut volatile = draft(1);
        volatile.volatility = Some(d("1.5"));
        let result = create_product(&db, &volatile).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let mut inverted = draft(1);
        inverted.quantity_range = Some(QuantityRange {
            min: d("5"),
            max: d("1"),
        });
        let result = create_product(&db, &inverted).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let mut off_step = draft(1);
        off_step.unit = "个".to_string();
        off_step.quantity_range = Some(QuantityRange::new(d("1.2"), d("1.8")).unwrap());
        let result = create_product(&db, &off_step).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::QuantityRangeOffStep { ref unit, .. } if unit == "个"
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let (db, category) = setup_with_category().await?;

        let product = create_product(&db, &draft(category.id)).await?;

        assert_eq!(product.name, "青菜");
        assert_eq!(product.unit, "千克");
        assert_eq!(product.category_name, category.name);
        assert_eq!(product.base_price, "4.50");
        assert!(!product.is_deleted);

        let plan_product = to_domain(&product)?;
        assert_eq!(plan_product.base_price, d("4.50"));
        assert_eq!(plan_product.volatility, Some(d("0.1")));
        assert_eq!(
            plan_product.quantity_range,
            Some(QuantityRange::new(d("1"), d("10"))?)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_unknown_category() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_product(&db, &draft(42)).await;
        assert!(matches!(result, Err(Error::CategoryNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected_until_deleted() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let first = create_product(&db, &draft(category.id)).await?;

        let result = create_product(&db, &draft(category.id)).await;
        assert!(matches!(result, Err(Error::DuplicateProduct { .. })));

        delete_product(&db, first.id).await?;
        let second = create_product(&db, &draft(category.id)).await?;
        assert_ne!(second.id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_integration() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let product = create_product(&db, &draft(category.id)).await?;

        let mut changed = draft(category.id);
        changed.name = "菠菜".to_string();
        changed.base_price = d("6");
        changed.volatility = None;
        let updated = update_product(&db, product.id, &changed).await?;

        assert_eq!(updated.name, "菠菜");
        assert_eq!(updated.base_price, "6.00");
        assert_eq!(updated.volatility, None);

        // Keeping its own name is not a conflict
        update_product(&db, product.id, &changed).await?;

        let found = get_product_by_name(&db, "菠菜").await?;
        assert_eq!(found.unwrap().id, product.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_integration() -> Result<()> {
        let (db, category) = setup_with_category().await?;
        let product = create_product(&db, &draft(category.id)).await?;

        let deleted = delete_product(&db, product.id).await?;
        assert!(deleted.is_deleted);
        assert!(get_all_active_products(&db).await?.is_empty());
        assert!(get_products_in_category(&db, category.id).await?.is_empty());
        assert!(get_product_by_id(&db, product.id).await?.is_some());

        let again = delete_product(&db, product.id).await;
        assert!(matches!(again, Err(Error::ProductNotFound { .. })));
        Ok(())
    }
}
