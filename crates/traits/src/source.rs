//! Data source trait definitions.

use carhart_primitives::{Date, FactorTables, PriceSeries};

/// Errors raised by external data sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// The source answered with data that does not parse.
    #[error("malformed data from {source_name}: {reason}")]
    Malformed {
        /// Which source or file produced the data.
        source_name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The source answered but had nothing for the request.
    #[error("no data for {0}")]
    Empty(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Shorthand for a malformed-data error.
    #[must_use]
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed { source_name: source_name.into(), reason: reason.into() }
    }

    /// Returns whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Io(_))
    }
}

/// Supplier of the raw four-factor data set.
///
/// Implementations return the tables as published: percentage points,
/// `YYYYMM` keys, and whatever trailing annotation rows the source carries.
pub trait FactorSource: Send + Sync {
    /// Fetch the 3-factor and momentum tables.
    ///
    /// # Errors
    /// Returns `SourceError` if the data cannot be retrieved or parsed.
    fn fetch_factors(&self) -> Result<FactorTables, SourceError>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}

/// Supplier of daily adjusted-close prices.
pub trait PriceSource: Send + Sync {
    /// Fetch prices for `entity` between `start` and `end` inclusive.
    ///
    /// # Errors
    /// Returns `SourceError` if the data cannot be retrieved or is empty.
    fn fetch_prices(
        &self,
        entity: &str,
        start: Date,
        end: Date,
    ) -> Result<PriceSeries, SourceError>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}
