//! Error types for panel construction.

/// Errors that can occur while normalizing, resampling or aligning series.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Polars error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Missing column.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Input data violates an ordering or content invariant.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// A date could not be represented.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Returns and factors share no dates.
    #[error("no overlapping dates between returns ({n_returns} rows) and factors")]
    AlignmentEmpty {
        /// Return rows considered before the join.
        n_returns: usize,
    },
}
