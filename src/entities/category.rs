//! Category entity - Groups products and carries the purchasing rule.
//!
//! The rule is stored as flat nullable columns. A row only counts as configured when
//! the mode and every field that mode needs are present.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "蔬菜", "肉类")
    #[sea_orm(unique)]
    pub name: String,
    /// Inactive categories are ignored by generation
    pub is_active: bool,
    /// `"daily"`, `"periodic"` or None when unconfigured
    pub purchase_mode: Option<String>,
    /// Minimum products per occurrence
    pub items_min: Option<i32>,
    /// Maximum products per occurrence
    pub items_max: Option<i32>,
    /// Days between periodic purchases
    pub cycle_days: Option<i32>,
    /// Allowed jitter around the cycle
    pub float_days: Option<i32>,
    /// When the category was created
    pub created_at: DateTime,
    /// When the category was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category has many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
