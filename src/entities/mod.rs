//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod plan_item;
pub mod procurement_plan;
pub mod product;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use plan_item::{Column as PlanItemColumn, Entity as PlanItem, Model as PlanItemModel};
pub use procurement_plan::{
    Column as ProcurementPlanColumn, Entity as ProcurementPlan, Model as ProcurementPlanModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
