//! Period returns from daily prices.

use carhart_primitives::{Date, PriceSeries, ResamplePeriod, columns};
use polars::prelude::*;

use crate::{PanelError, date_column, f64_column, to_epoch_days};

/// Period-end returns for one entity.
///
/// Columns: `date` (period end), `portfolio` (fractional return).
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    df: DataFrame,
}

impl ReturnSeries {
    /// Wrap a frame with `date` and `portfolio` columns.
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

    /// Number of periods.
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

    /// Return values in order.
    ///
    /// # Errors
    /// Returns `MissingColumn` if the frame has no portfolio column.
    pub fn values(&self) -> Result<Vec<Option<f64>>, PanelError> {
        f64_column(&self.df, columns::PORTFOLIO)
    }

    /// Keep only periods ending on or before `last`.
    ///
    /// # Errors
    /// Returns `PanelError` if the filter cannot be evaluated.
    pub fn truncate_after(&self, last: Date) -> Result<Self, PanelError> {
        let df = self
            .lazy()
            .filter(col(columns::DATE).lt_eq(lit(to_epoch_days(last)).cast(DataType::Date)))
            .collect()?;
        Ok(Self::from_frame(df))
    }
}

/// Compute period returns from a daily price series.
///
/// Prices are resampled onto every period end from the first traded period
/// to the last, keeping the last observation in each period. The
/// period-over-period fractional change is then taken, so each return spans
/// exactly one period. A period with no prices, and the period after it,
/// get a null return. The first period has no predecessor and is dropped.
/// Non-finite prices are ignored.
///
/// # Errors
/// Returns `InvalidDate` if a period end is unrepresentable, or a polars
/// error if the frame cannot be built.
pub fn compute_returns(
    prices: &PriceSeries,
    period: ResamplePeriod,
) -> Result<ReturnSeries, PanelError> {
    let points: Vec<_> = prices.points.iter().filter(|p| p.price.is_finite()).collect();

    let trade_dates: Vec<Date> = points.iter().map(|p| p.date).collect();
    let period_ends = points
        .iter()
        .map(|p| {
            period.period_end(p.date).ok_or_else(|| PanelError::InvalidDate(p.date.to_string()))
        })
        .collect::<Result<Vec<Date>, _>>()?;
    let grid = period_grid(&period_ends, period)?;
    let values: Vec<f64> = points.iter().map(|p| p.price).collect();

    let daily = DataFrame::new(vec![
        Column::new("trade_date".into(), trade_dates),
        Column::new("period_end".into(), period_ends),
        Column::new("price".into(), values),
    ])?;
    let last_prices = daily
        .lazy()
        .sort(["trade_date"], SortMultipleOptions::default())
        .group_by_stable([col("period_end")])
        .agg([col("price").last()]);

    let n_periods = grid.len();
    let df = DataFrame::new(vec![Column::new("period_end".into(), grid)])?
        .lazy()
        .join(
            last_prices,
            [col("period_end")],
            [col("period_end")],
            JoinArgs::new(JoinType::Left),
        )
        .sort(["period_end"], SortMultipleOptions::default())
        .with_column(
            (col("price") / col("price").shift(lit(1_i64)) - lit(1.0)).alias(columns::PORTFOLIO),
        )
        .slice(1, IdxSize::MAX)
        .select([col("period_end").alias(columns::DATE), col(columns::PORTFOLIO)])
        .collect()?;

    tracing::debug!(
        entity = %prices.entity,
        %period,
        observations = points.len(),
        periods = n_periods,
        null_returns = df.column(columns::PORTFOLIO)?.null_count(),
        "computed period returns"
    );
    Ok(ReturnSeries::from_frame(df))
}

/// Every period end from the earliest to the latest of `ends`, inclusive.
fn period_grid(ends: &[Date], period: ResamplePeriod) -> Result<Vec<Date>, PanelError> {
    let (Some(&first), Some(&last)) = (ends.iter().min(), ends.iter().max()) else {
        return Ok(Vec::new());
    };
    let mut grid = vec![first];
    let mut current = first;
    while current < last {
        current = period
            .next_period_end(current)
            .ok_or_else(|| PanelError::InvalidDate(current.to_string()))?;
        grid.push(current);
    }
    Ok(grid)
}
