//! Unified error types for the planner.
//!
//! Generation preconditions each get their own variant so callers can map them to
//! user-facing responses; the `Display` text is the reason shown to operators.

use rust_decimal::Decimal;
use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored JSON (warnings, settings) could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A decimal stored as text could not be parsed
    #[error("Invalid decimal '{value}' in column {column}")]
    InvalidDecimal {
        /// Column the value came from
        column: &'static str,
        /// Raw text
        value: String,
    },

    /// A unit label could not be normalized
    #[error("单位无效 '{unit}': {reason}")]
    InvalidUnit {
        /// Label as provided
        unit: String,
        /// Why it was rejected
        reason: String,
    },

    /// A money or quantity value is out of its allowed range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending value
        amount: Decimal,
    },

    /// A quantity range holds no multiple of its unit's step
    #[error("数量范围内没有符合单位步长的数量: [{min}, {max}] {unit}")]
    QuantityRangeOffStep {
        /// Range minimum
        min: Decimal,
        /// Range maximum
        max: Decimal,
        /// Canonical unit label
        unit: String,
    },

    /// A money precision outside the supported digits
    #[error("Unsupported money precision {precision}, expected 0 to {max}")]
    InvalidPrecision {
        /// Requested fraction digits
        precision: u32,
        /// Largest supported value
        max: u32,
    },

    /// A purchasing rule violates its invariants
    #[error("Invalid purchasing rule: {message}")]
    InvalidRule {
        /// What is wrong with the rule
        message: String,
    },

    /// A requested month range is malformed
    #[error("月份范围无效: {message}")]
    InvalidMonthRange {
        /// Which bound is wrong
        message: String,
    },

    /// Category lookup failed
    #[error("Category not found: {name}")]
    CategoryNotFound {
        /// Id or name used for the lookup
        name: String,
    },

    /// Another category already uses this name
    #[error("品类已存在: {name}")]
    DuplicateCategory {
        /// Conflicting name
        name: String,
    },

    /// A category with active products cannot be deactivated without a transfer target
    #[error("该品类下仍有产品")]
    CategoryHasProducts {
        /// Category being deactivated
        category_id: i64,
        /// Number of active products left in it
        product_count: u64,
    },

    /// Products cannot be transferred to the category they already belong to
    #[error("不能转移到同一品类")]
    TransferToSameCategory {
        /// Category being deactivated
        category_id: i64,
    },

    /// Products cannot be transferred to an inactive category
    #[error("目标品类已停用")]
    TransferTargetInactive {
        /// Requested target category
        category_id: i64,
    },

    /// Product lookup failed
    #[error("Product not found: {name}")]
    ProductNotFound {
        /// Id or name used for the lookup
        name: String,
    },

    /// Another active product already uses this name
    #[error("Product name already exists: {name}")]
    DuplicateProduct {
        /// Conflicting name
        name: String,
    },

    /// Plan lookup failed
    #[error("未找到采购计划: {date}")]
    PlanNotFound {
        /// Requested plan date
        date: String,
    },

    /// Some categories hold active products but have no complete rule
    #[error("存在未配置规则的品类")]
    CategoriesWithoutRules {
        /// Offending category ids
        category_ids: Vec<i64>,
    },

    /// No active products exist
    #[error("产品库为空")]
    EmptyCatalog,

    /// No daily budget range has been configured
    #[error("未配置预算区间")]
    BudgetRangeMissing,

    /// The configured daily budget range has min > max
    #[error("预算区间无效 (min {min} > max {max})")]
    BudgetRangeInvalid {
        /// Configured minimum
        min: Decimal,
        /// Configured maximum
        max: Decimal,
    },

    /// A product used for an item has no volatility configured
    #[error("产品缺少单价波动配置: {product}")]
    MissingVolatility {
        /// Product name
        product: String,
    },

    /// A product used for an item has no quantity range configured
    #[error("产品缺少采购数量范围配置: {product}")]
    MissingQuantityRange {
        /// Product name
        product: String,
    },

    /// Export requested for a month without stored plans
    #[error("无采购计划数据: {year_month}")]
    EmptyExport {
        /// Requested month key
        year_month: String,
    },

    /// I/O failure (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable lookup failed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
