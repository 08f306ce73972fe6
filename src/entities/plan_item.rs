//! Plan item entity - A single line of a procurement plan.
//!
//! Product and category details are snapshots so later catalog edits leave history intact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plan_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the owning plan
    pub plan_id: i64,
    /// Order of the item within its plan
    pub position: i32,
    /// Source product
    pub product_id: i64,
    /// Category at generation time
    pub category_id: Option<i64>,
    /// Category name at generation time
    pub category_name: Option<String>,
    /// Product name at generation time
    pub name: String,
    /// Unit label
    pub unit: String,
    /// Unit price
    pub price: String,
    /// Purchased quantity
    pub quantity: String,
    /// Line amount
    pub amount: String,
}

/// Defines relationships between items and their plan
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one plan
    #[sea_orm(
        belongs_to = "super::procurement_plan::Entity",
        from = "Column::PlanId",
        to = "super::procurement_plan::Column::Id",
        on_delete = "Cascade"
    )]
    Plan,
}

impl Related<super::procurement_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
