//! Procurement plan entity - One generated purchasing day.
//!
//! Line items live in `plan_items`; warnings raised while generating the day are kept
//! as a JSON array.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Procurement plan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "procurement_plans")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Purchasing day
    #[sea_orm(unique)]
    pub plan_date: Date,
    /// Month key in `YYYY-MM` form
    pub year_month: String,
    /// Rounded sum of item amounts
    pub total_amount: String,
    /// JSON-encoded warnings of the day
    pub warnings: String,
    /// Who generated the plan
    pub creator_id: Option<String>,
    /// Who last edited the plan
    pub updated_by: Option<String>,
    /// When the plan was created
    pub created_at: DateTime,
    /// When the plan was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between plans and their items
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan has many line items
    #[sea_orm(has_many = "super::plan_item::Entity")]
    Items,
}

impl Related<super::plan_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
