//! Calendar periods covered by a report or an automation run.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{DomainError, DomainResult};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::Validation(format!(
                "period end {} is before period start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Full calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        Self {
            start,
            end: last_day_of_month(date.year(), date.month()),
        }
    }

    /// Full calendar month preceding the one containing `date`.
    pub fn previous_month(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let previous = first.checked_sub_months(Months::new(1)).unwrap_or(first);
        Self::month_of(previous)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days, both bounds included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// `"<Month> <Year>"` of the period start, e.g. `"February 2025"`.
    pub fn label(&self) -> String {
        month_label(self.start)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", MONTH_NAMES[date.month0() as usize], date.year())
}

/// Last calendar day of `month` (1-12) in `year`, leap years included.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
