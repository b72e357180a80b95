//! Per-entity failure records.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Why an entity was skipped in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum FailureKind {
    /// Price data was unreachable, empty or malformed.
    #[display("source_data")]
    SourceData,
    /// Returns and factors shared no dates.
    #[display("alignment_empty")]
    AlignmentEmpty,
    /// Too few observations or collinear predictors.
    #[display("regression_underdetermined")]
    RegressionUnderdetermined,
    /// Any other per-entity processing error.
    #[display("processing")]
    Processing,
}

/// One skipped entity and the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Entity identifier as given in the batch.
    pub entity: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub reason: String,
}

impl FailureRecord {
    /// Create a failure record.
    #[must_use]
    pub fn new(entity: impl Into<String>, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self { entity: entity.into(), kind, reason: reason.into() }
    }
}
