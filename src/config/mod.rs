/// Database configuration and connection management
pub mod database;

/// Budget, calendar, export and seed catalog loading from config.toml
pub mod planner;
