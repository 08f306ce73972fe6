//! Monthly expense statement built from stored plans.
//!
//! Each workday becomes one row listing its items as `名称金额元`. Amounts are shown at the
//! export precision (0, 1 or 2 decimals) with a floor at the smallest displayable unit, so
//! a non-zero amount never shows as zero. Day subtotals add up the displayed amounts, and
//! the month total adds up the subtotals.

use crate::{
    core::{
        model::DayPlan,
        numeric::{MONEY_PRECISION, check_precision, round_to},
        plan::list_plans,
        workdays::YearMonth,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::fmt;
use tracing::instrument;

/// Column headers of the statement.
pub const COLUMNS: [&str; 6] = ["序号", "时间", "物资及金额", "小计（元）", "经手人", "证明人"];

/// One day of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRow {
    /// 1-based row number
    pub index: usize,
    /// `MM月DD日`
    pub date_text: String,
    /// Items joined by `、`
    pub items_text: String,
    /// Sum of the displayed item amounts
    pub day_total: Decimal,
    /// Person who handled the purchase
    pub handler: String,
    /// Person who witnessed it
    pub witness: String,
}

/// Statement of one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthStatement {
    /// Month covered
    pub month: YearMonth,
    /// Heading line
    pub title: String,
    /// Fraction digits used for amounts
    pub precision: u32,
    /// Rows ordered by date
    pub rows: Vec<StatementRow>,
    /// Sum of the day totals
    pub month_total: Decimal,
}

fn min_display_unit(precision: u32) -> Decimal {
    Decimal::new(1, precision)
}

/// Rounds an amount for display. Non-zero amounts smaller than one display unit become
/// one unit, keeping their sign.
#[must_use]
pub fn round_money(value: Decimal, precision: u32) -> Decimal {
    if value.is_zero() {
        return Decimal::ZERO;
    }
    let unit = min_display_unit(precision);
    if value.abs() < unit {
        return if value.is_sign_positive() { unit } else { -unit };
    }
    round_to(value, precision)
}

fn format_fixed(value: Decimal, precision: u32) -> String {
    let mut rounded = round_to(value, precision);
    rounded.rescale(precision);
    rounded.to_string()
}

fn day_row(index: usize, plan: &DayPlan, precision: u32) -> StatementRow {
    let price_precision = precision.max(MONEY_PRECISION);
    let mut parts = Vec::with_capacity(plan.items.len());
    let mut shown_amounts = Vec::new();
    for item in &plan.items {
        if item.amount.is_zero() {
            parts.push(format!(
                "{}{}元",
                item.name,
                format_fixed(item.price, price_precision)
            ));
            continue;
        }
        let shown = round_money(item.amount, precision);
        shown_amounts.push(shown);
        parts.push(format!("{}{}元", item.name, format_fixed(shown, precision)));
    }

    let day_total = if shown_amounts.is_empty() {
        round_money(plan.total_amount, precision)
    } else {
        shown_amounts.into_iter().sum()
    };

    StatementRow {
        index,
        date_text: plan.date.format("%m月%d日").to_string(),
        items_text: parts.join("、"),
        day_total,
        handler: String::new(),
        witness: String::new(),
    }
}

/// Builds the statement of `month` from its stored plans.
///
/// # Errors
/// Returns [`Error::EmptyExport`] when `plans` is empty, or [`Error::InvalidPrecision`]
/// when `precision` is above two digits.
pub fn build_statement(month: YearMonth, plans: &[DayPlan], precision: u32) -> Result<MonthStatement> {
    let precision = check_precision(precision)?;
    if plans.is_empty() {
        return Err(Error::EmptyExport {
            year_month: month.to_string(),
        });
    }

    let mut sorted: Vec<&DayPlan> = plans.iter().collect();
    sorted.sort_by_key(|plan| plan.date);
    let rows: Vec<StatementRow> = sorted
        .into_iter()
        .enumerate()
        .map(|(i, plan)| day_row(i + 1, plan, precision))
        .collect();
    let month_total = rows.iter().map(|row| row.day_total).sum();

    Ok(MonthStatement {
        month,
        title: format!("{}年{:02}月采购开支明细表", month.year, month.month),
        precision,
        rows,
        month_total,
    })
}

impl fmt::Display for MonthStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.precision;
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", COLUMNS.join("\t"))?;
        for row in &self.rows {
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.index,
                row.date_text,
                row.items_text,
                format_fixed(row.day_total, precision),
                row.handler,
                row.witness
            )?;
        }
        writeln!(
            f,
            "总计\t\t\t{}\t\t",
            format_fixed(self.month_total, precision)
        )
    }
}

/// Renders a statement as tab-separated plain text.
#[must_use]
pub fn render_statement(statement: &MonthStatement) -> String {
    statement.to_string()
}

/// Loads the stored plans of `month` and builds its statement.
///
/// # Errors
/// Returns an error if the query fails, the month has no plans, or the precision is
/// unsupported.
#[instrument(skip(db), fields(month = %month))]
pub async fn export_month(
    db: &DatabaseConnection,
    month: YearMonth,
    precision: u32,
) -> Result<MonthStatement> {
    let plans = list_plans(db, &[month.to_string()]).await?;
    build_statement(month, &plans, precision)
}
