//! Error types for mathematical operations.

/// Errors that can occur during mathematical operations.
#[derive(Debug, thiserror::Error)]
pub enum MathError {
    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Fewer observations than free parameters.
    #[error("insufficient observations: need at least {required}, got {actual}")]
    InsufficientObservations {
        /// Number of parameters to estimate.
        required: usize,
        /// Observations supplied.
        actual: usize,
    },

    /// Singular or nearly singular system (collinear predictors).
    #[error("singular design matrix: pivot {pivot:e} in column {column} below tolerance")]
    Singular {
        /// Column where elimination broke down.
        column: usize,
        /// Offending pivot magnitude.
        pivot: f64,
    },

    /// Linear algebra error.
    #[error("linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Empty data.
    #[error("empty data provided")]
    EmptyData,

    /// Numerical instability (NaN or Inf).
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}

impl MathError {
    /// Returns whether the error means the model cannot be identified from
    /// the data, as opposed to a caller bug.
    #[must_use]
    pub const fn is_underdetermined(&self) -> bool {
        matches!(self, Self::InsufficientObservations { .. } | Self::Singular { .. })
    }
}
