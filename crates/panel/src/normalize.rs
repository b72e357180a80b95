//! Factor data normalization.
//!
//! The published factor files end with annotation text (annual tables,
//! copyright lines) that does not parse as monthly data. Each raw table is
//! parsed once upstream; here the valid prefix is sliced off, keyed by
//! month-end date and converted from percentage points to decimals.

use carhart_primitives::{Date, FactorTables, RawFactorTable, columns, parse_month_key};
use polars::prelude::*;

use crate::{PanelError, date_column};

/// Columns the 3-factor table must provide.
const THREE_FACTOR_COLUMNS: [&str; 4] = [columns::MKT_RF, columns::SMB, columns::HML, columns::RF];

/// Columns the momentum table must provide.
const MOMENTUM_COLUMNS: [&str; 1] = [columns::MOM_RAW];

/// Normalized factor returns keyed by month-end date.
///
/// Columns: `date`, `Mkt-RF`, `SMB`, `HML`, `RF`, `Mom`, all in decimal units.
/// Months present in only one source table carry nulls in the other table's
/// columns.
#[derive(Debug, Clone)]
pub struct FactorSeries {
    df: DataFrame,
}

impl FactorSeries {
    /// Wrap an already-normalized frame.
    #[must_use]
    pub const fn from_frame(df: DataFrame) -> Self {
        Self { df }
    }

    /// Underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Lazy view for joins.
    #[must_use]
    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    /// Number of months.
    #[must_use]
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Month-end dates in order.
    ///
    /// # Errors
    /// Returns `MissingColumn` if the frame has no date column.
    pub fn dates(&self) -> Result<Vec<Date>, PanelError> {
        Ok(date_column(&self.df, columns::DATE)?.into_iter().flatten().collect())
    }

    /// Latest month-end date with factor data.
    ///
    /// # Errors
    /// Returns `MissingColumn` if the frame has no date column.
    pub fn last_date(&self) -> Result<Option<Date>, PanelError> {
        Ok(self.dates()?.into_iter().max())
    }
}

/// Normalize one raw factor table.
///
/// Rows from the first one with a missing cell or unparseable month key
/// onward are discarded; a table with no such row is used whole. Column
/// labels are whitespace-trimmed, keys become month-end dates and values are
/// divided by 100.
///
/// # Errors
/// Returns `MissingColumn` if a `required` label is absent after trimming, or
/// `Malformed` if the valid months are not strictly ascending.
pub fn normalize_table(table: &RawFactorTable, required: &[&str]) -> Result<DataFrame, PanelError> {
    let labels: Vec<&str> = table.columns.iter().map(|c| c.trim()).collect();
    for name in required {
        if !labels.contains(name) {
            return Err(PanelError::MissingColumn((*name).to_string()));
        }
    }

    let valid_len = table.first_invalid_row().unwrap_or(table.len());
    let rows = &table.rows[..valid_len];
    tracing::debug!(
        total = table.len(),
        valid = valid_len,
        "sliced factor table at first invalid row"
    );

    let dates = rows
        .iter()
        .map(|row| {
            parse_month_key(&row.key).ok_or_else(|| PanelError::InvalidDate(row.key.clone()))
        })
        .collect::<Result<Vec<Date>, _>>()?;

    if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
        return Err(PanelError::Malformed(format!(
            "factor months out of order: {} followed by {}",
            pair[0], pair[1]
        )));
    }

    let mut frame_columns = vec![Column::new(columns::DATE.into(), dates)];
    for (j, label) in labels.iter().enumerate() {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|row| row.values.get(j).copied().flatten().map(|v| v / 100.0))
            .collect();
        frame_columns.push(Column::new((*label).into(), values));
    }

    Ok(DataFrame::new(frame_columns)?)
}

/// Combine the 3-factor and momentum tables into one factor series.
///
/// The two normalized tables are outer-joined on date and sorted.
///
/// # Errors
/// Returns `PanelError` if either table is missing required columns, is out
/// of order, or if no valid month survives normalization.
pub fn normalize_factors(tables: &FactorTables) -> Result<FactorSeries, PanelError> {
    let three = normalize_table(&tables.three_factor, &THREE_FACTOR_COLUMNS)?;
    let momentum = normalize_table(&tables.momentum, &MOMENTUM_COLUMNS)?;

    let mut momentum_cols = vec![col(columns::DATE)];
    momentum_cols.extend(MOMENTUM_COLUMNS.iter().map(|c| col(*c)));

    let df = three
        .lazy()
        .join(
            momentum.lazy().select(momentum_cols),
            [col(columns::DATE)],
            [col(columns::DATE)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
        .sort([columns::DATE], SortMultipleOptions::default())
        .collect()?;

    if df.height() == 0 {
        return Err(PanelError::Malformed("no valid factor months".to_string()));
    }

    tracing::debug!(months = df.height(), "normalized factor series");
    Ok(FactorSeries::from_frame(df))
}
