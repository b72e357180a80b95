//! CSV output for coefficient tables and failure reports.

use std::path::{Path, PathBuf};

use carhart_primitives::{CoefficientMatrix, FailureRecord};
use carhart_traits::{CoefficientSink, SinkError};

use crate::IoError;

/// Render the coefficient table: header `coefficient,<entities...>`, then one
/// row per coefficient.
///
/// # Errors
/// Returns a CSV error if a record cannot be written.
pub fn coefficients_csv(matrix: &CoefficientMatrix) -> Result<String, IoError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["coefficient".to_string()];
    header.extend(matrix.entities().iter().cloned());
    wtr.write_record(&header)?;

    for (i, label) in matrix.row_labels().iter().enumerate() {
        let mut record = vec![label.clone()];
        record.extend(matrix.row(i).unwrap_or_default().iter().map(f64::to_string));
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

/// Render the failure report with header `entity,kind,reason`.
///
/// # Errors
/// Returns a CSV error if a record cannot be written.
pub fn failures_csv(failures: &[FailureRecord]) -> Result<String, IoError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["entity", "kind", "reason"])?;
    for failure in failures {
        wtr.write_record([
            failure.entity.as_str(),
            failure.kind.to_string().as_str(),
            failure.reason.as_str(),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, IoError> {
    let bytes = wtr.into_inner().map_err(|e| IoError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| IoError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Sink writing the coefficient table, and optionally the failure report, to
/// files.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    failures_path: Option<PathBuf>,
}

impl CsvSink {
    /// Write the coefficient table to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), failures_path: None }
    }

    /// Also write the failure report to `path`.
    #[must_use]
    pub fn with_failures(mut self, path: impl Into<PathBuf>) -> Self {
        self.failures_path = Some(path.into());
        self
    }

    /// Path of the coefficient table.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CoefficientSink for CsvSink {
    fn write_coefficients(&mut self, matrix: &CoefficientMatrix) -> Result<(), SinkError> {
        std::fs::write(&self.path, coefficients_csv(matrix)?)?;
        tracing::info!(
            path = %self.path.display(),
            entities = matrix.n_columns(),
            "wrote coefficient table"
        );
        Ok(())
    }

    fn write_failures(&mut self, failures: &[FailureRecord]) -> Result<(), SinkError> {
        let Some(path) = &self.failures_path else {
            return Ok(());
        };
        std::fs::write(path, failures_csv(failures)?)?;
        tracing::info!(path = %path.display(), failures = failures.len(), "wrote failure report");
        Ok(())
    }
}
