/// Category storage and purchasing rules
pub mod category;
/// Monthly expense statements
pub mod export;
/// Plan generation across month ranges
pub mod generator;
/// Line item pricing and quantities
pub mod item;
/// Domain records used by the planner
pub mod model;
/// Decimal rounding and random draws
pub mod numeric;
/// Stored plan persistence and edits
pub mod plan;
/// Product storage and validation
pub mod product;
/// Daily budget reconciliation
pub mod reconcile;
/// Regeneration of stored months
pub mod regenerate;
/// Rule gap validation
pub mod rules;
/// Periodic purchase scheduling
pub mod schedule;
/// Budget-aware product selection
pub mod selector;
/// Planner settings
pub mod settings;
/// Database-backed reader traits
pub mod store;
/// Unit labels and quantity steps
pub mod units;
/// Month ranges and workday calendars
pub mod workdays;
