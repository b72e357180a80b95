//! Alignment of entity returns with factor returns.

use carhart_primitives::{Date, columns};
use polars::prelude::*;

use crate::{FactorSeries, PanelError, ReturnSeries, date_column, f64_column};

/// Factor columns the aligner reads, as labeled in a [`FactorSeries`].
const FACTOR_COLUMNS: [&str; 5] =
    [columns::MKT_RF, columns::SMB, columns::HML, columns::MOM_RAW, columns::RF];

/// Returns and factors on a shared period-end index.
///
/// Columns: `date`, `portfolio`, `mkt_excess`, `SMB`, `HML`, `mom`, `RF`,
/// `port_excess`, sorted by date.
#[derive(Debug, Clone)]
pub struct AlignedPanel {
    df: DataFrame,
}

impl AlignedPanel {
    /// Wrap a frame with the panel columns.
    #[must_use]
    pub const fn from_frame(df: DataFrame) -> Self {
        Self { df }
    }

    /// Underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Number of aligned periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Period-end dates in order.
    ///
    /// # Errors
    /// Returns `MissingColumn` if the frame has no date column.
    pub fn dates(&self) -> Result<Vec<Date>, PanelError> {
        Ok(date_column(&self.df, columns::DATE)?.into_iter().flatten().collect())
    }

    /// Values of one column, nulls kept.
    ///
    /// # Errors
    /// Returns `MissingColumn` if the column does not exist.
    pub fn column(&self, name: &str) -> Result<Vec<Option<f64>>, PanelError> {
        f64_column(&self.df, name)
    }
}

/// Inner-join an entity's returns with the factor series.
///
/// Returns dated after the last factor month are dropped first, since factor
/// publication lags prices. The market and momentum columns take their
/// regression names and `port_excess = portfolio - RF` is derived after the
/// join.
///
/// # Errors
/// Returns `AlignmentEmpty` when no dates overlap, `MissingColumn` if the
/// factor series lacks a factor column, or `Malformed` if it has no dates.
pub fn align(returns: &ReturnSeries, factors: &FactorSeries) -> Result<AlignedPanel, PanelError> {
    let factor_names = factors.frame().get_column_names();
    for name in FACTOR_COLUMNS {
        if !factor_names.iter().any(|c| c.as_str() == name) {
            return Err(PanelError::MissingColumn(name.to_string()));
        }
    }

    let last = factors
        .last_date()?
        .ok_or_else(|| PanelError::Malformed("factor series has no dates".to_string()))?;
    let truncated = returns.truncate_after(last)?;

    let df = truncated
        .lazy()
        .join(
            factors.lazy(),
            [col(columns::DATE)],
            [col(columns::DATE)],
            JoinArgs::new(JoinType::Inner),
        )
        .select([
            col(columns::DATE),
            col(columns::PORTFOLIO),
            col(columns::MKT_RF).alias(columns::MKT_EXCESS),
            col(columns::SMB),
            col(columns::HML),
            col(columns::MOM_RAW).alias(columns::MOM),
            col(columns::RF),
        ])
        .with_column((col(columns::PORTFOLIO) - col(columns::RF)).alias(columns::PORT_EXCESS))
        .sort([columns::DATE], SortMultipleOptions::default())
        .collect()?;

    if df.height() == 0 {
        return Err(PanelError::AlignmentEmpty { n_returns: truncated.len() });
    }

    tracing::debug!(
        returns = returns.len(),
        after_truncation = truncated.len(),
        aligned = df.height(),
        last_factor_date = %last,
        "aligned returns with factors"
    );
    Ok(AlignedPanel::from_frame(df))
}
