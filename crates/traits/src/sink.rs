//! Output sink trait definitions.

use carhart_primitives::{CoefficientMatrix, FailureRecord};

/// Errors raised while persisting results.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Destination for the final coefficient table.
pub trait CoefficientSink {
    /// Persist the matrix: coefficient names as rows, entities as columns.
    ///
    /// # Errors
    /// Returns `SinkError` if the table cannot be written.
    fn write_coefficients(&mut self, matrix: &CoefficientMatrix) -> Result<(), SinkError>;

    /// Persist the entities skipped by a batch. Sinks without a failure
    /// report ignore them.
    ///
    /// # Errors
    /// Returns `SinkError` if the report cannot be written.
    fn write_failures(&mut self, failures: &[FailureRecord]) -> Result<(), SinkError> {
        let _ = failures;
        Ok(())
    }
}
