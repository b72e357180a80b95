//! Resampling periods and calendar helpers.

use std::str::FromStr;

use chrono::{Datelike, Duration};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Date;

/// Granularity a daily price series is resampled to before computing returns.
///
/// Every period is labeled by its calendar end date, matching the month-end
/// index of the published factor data.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
pub enum ResamplePeriod {
    /// Weeks ending on Sunday.
    #[display("weekly")]
    Weekly,
    /// Calendar months.
    #[default]
    #[display("monthly")]
    Monthly,
    /// Calendar quarters.
    #[display("quarterly")]
    Quarterly,
    /// Calendar years.
    #[display("annual")]
    Annual,
}

impl ResamplePeriod {
    /// Returns the end date of the period containing `date`.
    ///
    /// Returns `None` only when the period end falls outside the representable
    /// date range.
    #[must_use]
    pub fn period_end(&self, date: Date) -> Option<Date> {
        match self {
            Self::Weekly => {
                let days = (7 - date.weekday().num_days_from_sunday()) % 7;
                date.checked_add_signed(Duration::days(i64::from(days)))
            }
            Self::Monthly => month_end(date.year(), date.month()),
            Self::Quarterly => month_end(date.year(), date.month().div_ceil(3) * 3),
            Self::Annual => month_end(date.year(), 12),
        }
    }

    /// Returns the end date of the period after the one ending on `end`.
    #[must_use]
    pub fn next_period_end(&self, end: Date) -> Option<Date> {
        self.period_end(end.succ_opt()?)
    }
}

impl FromStr for ResamplePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "week" | "weekly" => Ok(Self::Weekly),
            "m" | "month" | "monthly" => Ok(Self::Monthly),
            "q" | "quarter" | "quarterly" => Ok(Self::Quarterly),
            "a" | "y" | "year" | "annual" | "yearly" => Ok(Self::Annual),
            other => Err(format!("unknown resample period: {other}")),
        }
    }
}

/// Last calendar day of the given month.
#[must_use]
pub fn month_end(year: i32, month: u32) -> Option<Date> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    Date::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Parse a `YYYYMM` month identifier into the month's last calendar day.
///
/// Surrounding whitespace is ignored. Anything other than exactly six ASCII
/// digits with a month in `1..=12` yields `None`.
#[must_use]
pub fn parse_month_key(key: &str) -> Option<Date> {
    let key = key.trim();
    if key.len() != 6 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = key[..4].parse().ok()?;
    let month: u32 = key[4..].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    month_end(year, month)
}
