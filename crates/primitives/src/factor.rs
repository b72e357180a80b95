//! Factor data type definitions.

use serde::{Deserialize, Serialize};

/// Canonical column names used throughout the pipeline.
pub mod columns {
    /// Period-end date index.
    pub const DATE: &str = "date";
    /// Market excess return as labeled by the factor library.
    pub const MKT_RF: &str = "Mkt-RF";
    /// Momentum as labeled by the factor library (after trimming).
    pub const MOM_RAW: &str = "Mom";
    /// Size factor.
    pub const SMB: &str = "SMB";
    /// Value factor.
    pub const HML: &str = "HML";
    /// Risk-free rate.
    pub const RF: &str = "RF";
    /// Market excess return, canonical regression name.
    pub const MKT_EXCESS: &str = "mkt_excess";
    /// Momentum, canonical regression name.
    pub const MOM: &str = "mom";
    /// Entity return.
    pub const PORTFOLIO: &str = "portfolio";
    /// Entity return in excess of the risk-free rate.
    pub const PORT_EXCESS: &str = "port_excess";
}

/// One raw row of a factor table: the month key text and its numeric cells.
///
/// A `None` cell is a blank or non-numeric value in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFactorRow {
    /// Month identifier as found in the source (`YYYYMM` for valid rows).
    pub key: String,
    /// One cell per table column, in column order.
    pub values: Vec<Option<f64>>,
}

impl RawFactorRow {
    /// Create a new raw row.
    #[must_use]
    pub fn new(key: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self { key: key.into(), values }
    }

    /// Returns true if any cell is missing or non-finite.
    #[must_use]
    pub fn has_missing(&self, n_columns: usize) -> bool {
        self.values.len() < n_columns
            || self.values.iter().take(n_columns).any(|v| !v.is_some_and(f64::is_finite))
    }
}

/// A factor table as delivered by a factor-data source.
///
/// Values are still in percentage points and the table may carry a trailing
/// block of annotation rows that do not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFactorTable {
    /// Column labels exactly as they appear in the source header.
    pub columns: Vec<String>,
    /// Rows in source order.
    pub rows: Vec<RawFactorRow>,
}

impl RawFactorTable {
    /// Create a new raw table.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<RawFactorRow>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows, including any trailing malformed ones.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first row with a missing value or an unparseable key.
    #[must_use]
    pub fn first_invalid_row(&self) -> Option<usize> {
        let n = self.columns.len();
        self.rows
            .iter()
            .position(|row| row.has_missing(n) || crate::parse_month_key(&row.key).is_none())
    }
}

/// The two raw tables that make up the four-factor data set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorTables {
    /// Market excess return, size, value and risk-free rate.
    pub three_factor: RawFactorTable,
    /// Momentum.
    pub momentum: RawFactorTable,
}

impl FactorTables {
    /// Create a new pair of factor tables.
    #[must_use]
    pub const fn new(three_factor: RawFactorTable, momentum: RawFactorTable) -> Self {
        Self { three_factor, momentum }
    }
}
