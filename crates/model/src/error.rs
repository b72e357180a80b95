//! Error types for regression and batch orchestration.

use carhart_math::MathError;
use carhart_panel::PanelError;
use carhart_traits::{SinkError, SourceError};

/// Errors that can occur while running the four-factor pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An external source returned malformed, empty or unreachable data.
    #[error("source data error: {0}")]
    SourceData(#[from] SourceError),

    /// Returns and factors share no dates.
    #[error("no overlapping dates between returns ({n_returns} periods) and factor data")]
    AlignmentEmpty {
        /// Return periods available before the join.
        n_returns: usize,
    },

    /// Too few observations or collinear predictors.
    #[error("regression underdetermined: {0}")]
    RegressionUnderdetermined(MathError),

    /// Invalid batch configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Panel construction error.
    #[error("panel error: {0}")]
    Panel(PanelError),

    /// Math error.
    #[error("math error: {0}")]
    Math(MathError),

    /// Output sink error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl ModelError {
    /// Returns whether a batch may skip the entity that raised this error and
    /// carry on with the rest.
    ///
    /// Only meaningful for errors raised while processing one entity. A
    /// `SourceData` error from the factor fetch still aborts
    /// [`BatchRunner::run`](crate::BatchRunner::run).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::Sink(_))
    }
}

impl From<PanelError> for ModelError {
    fn from(err: PanelError) -> Self {
        match err {
            PanelError::AlignmentEmpty { n_returns } => Self::AlignmentEmpty { n_returns },
            other => Self::Panel(other),
        }
    }
}

impl From<MathError> for ModelError {
    fn from(err: MathError) -> Self {
        if err.is_underdetermined() { Self::RegressionUnderdetermined(err) } else { Self::Math(err) }
    }
}
