//! Product entity - A purchasable item with its pricing and quantity configuration.
//!
//! Money and quantity columns hold decimal text so values round-trip exactly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name, unique among products that are not deleted
    pub name: String,
    /// ID of the owning category
    pub category_id: i64,
    /// Category name at the time the product was last saved
    pub category_name: String,
    /// Canonical unit label (e.g., "斤", "个")
    pub unit: String,
    /// Reference unit price
    pub base_price: String,
    /// Relative price drift in [0, 1]
    pub volatility: Option<String>,
    /// Smallest quantity per line item
    pub quantity_min: Option<String>,
    /// Largest quantity per line item
    pub quantity_max: Option<String>,
    /// Soft delete flag - if true, product is hidden but data is preserved
    pub is_deleted: bool,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
