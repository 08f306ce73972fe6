//! Workday calendars and month ranges.
//!
//! The planner only buys on workdays. The default calendar is Monday to Friday adjusted by
//! configured holidays and make-up workdays; a listed calendar takes an explicit set of
//! dates instead.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::fmt;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    /// Calendar year
    pub year: i32,
    /// Month, 1–12
    pub month: u32,
}

impl YearMonth {
    /// Creates a month.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMonthRange`] when `month` is outside 1–12.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidMonthRange {
                message: format!("月份值无效: {month}"),
            });
        }
        Ok(Self { year, month })
    }

    /// Parses a `YYYY-MM` key.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMonthRange`] when the text is not a valid month key.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidMonthRange {
            message: format!("expected YYYY-MM, got '{text}'"),
        };
        let (year, month) = text.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(self) -> Option<NaiveDate> {
        self.next().first_day().and_then(|d| d.pred_opt())
    }

    /// The following month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whether `date` falls inside this month.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Month of a date.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Every date of the month.
    #[must_use]
    pub fn days(self) -> Vec<NaiveDate> {
        let Some(first) = self.first_day() else {
            return Vec::new();
        };
        first
            .iter_days()
            .take_while(|d| self.contains(*d))
            .collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// An inclusive range of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    /// First month
    pub start: YearMonth,
    /// Last month
    pub end: YearMonth,
}

impl MonthRange {
    /// Creates a validated range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMonthRange`] when start is after end or a year lies outside
    /// 2000–2100.
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidMonthRange {
                message: format!("{start} is after {end}"),
            });
        }
        if start.year < 2000 || end.year > 2100 {
            return Err(Error::InvalidMonthRange {
                message: "年份值无效".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// A range of a single month.
    ///
    /// # Errors
    /// Same conditions as [`MonthRange::new`].
    pub fn single(month: YearMonth) -> Result<Self> {
        Self::new(month, month)
    }

    /// Months of the range in order.
    #[must_use]
    pub fn months(&self) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut current = self.start;
        while current <= self.end {
            months.push(current);
            current = current.next();
        }
        months
    }

    /// `YYYY-MM` keys of the range in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.months().iter().map(ToString::to_string).collect()
    }
}

/// Source of workdays for a month.
#[allow(async_fn_in_trait)]
pub trait WorkdayProvider {
    /// Sorted workdays of the month.
    ///
    /// # Errors
    /// Implementations backed by external sources may fail.
    async fn workdays(&self, month: YearMonth) -> Result<Vec<NaiveDate>>;
}

impl<T: WorkdayProvider> WorkdayProvider for &T {
    async fn workdays(&self, month: YearMonth) -> Result<Vec<NaiveDate>> {
        (**self).workdays(month).await
    }
}

/// Monday to Friday calendar with holiday and make-up workday overrides.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
    extra_workdays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    /// Plain Monday to Friday calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar with overrides.
    #[must_use]
    pub fn with_overrides(
        holidays: impl IntoIterator<Item = NaiveDate>,
        extra_workdays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            extra_workdays: extra_workdays.into_iter().collect(),
        }
    }

    /// Whether `date` is a workday.
    #[must_use]
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        if self.extra_workdays.contains(&date) {
            return true;
        }
        if self.holidays.contains(&date) {
            return false;
        }
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Workdays of the month.
    #[must_use]
    pub fn month_workdays(&self, month: YearMonth) -> Vec<NaiveDate> {
        month
            .days()
            .into_iter()
            .filter(|d| self.is_workday(*d))
            .collect()
    }
}

impl WorkdayProvider for WeekdayCalendar {
    async fn workdays(&self, month: YearMonth) -> Result<Vec<NaiveDate>> {
        Ok(self.month_workdays(month))
    }
}

/// Calendar defined by an explicit list of dates.
#[derive(Debug, Clone, Default)]
pub struct ListedWorkdays {
    days: BTreeSet<NaiveDate>,
}

impl ListedWorkdays {
    /// Calendar made of exactly these dates.
    #[must_use]
    pub fn new(days: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }
}

impl WorkdayProvider for ListedWorkdays {
    async fn workdays(&self, month: YearMonth) -> Result<Vec<NaiveDate>> {
        Ok(self
            .days
            .iter()
            .copied()
            .filter(|d| month.contains(*d))
            .collect())
    }
}

/// First workday on or after `target` in a sorted workday list.
#[must_use]
pub fn shift_to_next_workday(target: NaiveDate, workdays: &[NaiveDate]) -> Option<NaiveDate> {
    workdays.iter().copied().find(|day| *day >= target)
}
