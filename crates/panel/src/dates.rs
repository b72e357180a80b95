//! Conversions between chrono dates and polars date columns.

use carhart_primitives::Date;
use chrono::Datelike;
use polars::prelude::*;

use crate::PanelError;

/// Days from 0001-01-01 to 1970-01-01, the polars `Date` epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days since the Unix epoch, the physical representation of a polars `Date`.
#[must_use]
pub fn to_epoch_days(date: Date) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`to_epoch_days`].
#[must_use]
pub fn from_epoch_days(days: i32) -> Option<Date> {
    Date::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Read a `Date` column into chrono dates.
///
/// # Errors
/// Returns `MissingColumn` if the column does not exist.
pub fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<Date>>, PanelError> {
    let column = df.column(name).map_err(|_| PanelError::MissingColumn(name.to_string()))?;
    let days = column.cast(&DataType::Int32)?;
    Ok(days.i32()?.into_iter().map(|d| d.and_then(from_epoch_days)).collect())
}

/// Read a float column, keeping nulls.
///
/// # Errors
/// Returns `MissingColumn` if the column does not exist.
pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, PanelError> {
    let column = df.column(name).map_err(|_| PanelError::MissingColumn(name.to_string()))?;
    let values = column.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}
