//! Regression coefficient containers.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Terms of the four-factor regression, in output row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum CoefficientName {
    /// Regression constant.
    #[display("Intercept")]
    Intercept,
    /// Market excess return loading.
    #[display("mkt_excess")]
    MktExcess,
    /// Size loading.
    #[display("SMB")]
    Smb,
    /// Value loading.
    #[display("HML")]
    Hml,
    /// Momentum loading.
    #[display("mom")]
    Mom,
}

impl CoefficientName {
    /// All terms in design-matrix column order.
    pub const ALL: [Self; 5] = [Self::Intercept, Self::MktExcess, Self::Smb, Self::Hml, Self::Mom];

    /// The predictors, excluding the intercept.
    pub const PREDICTORS: [Self; 4] = [Self::MktExcess, Self::Smb, Self::Hml, Self::Mom];

    /// Row label used in coefficient tables.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Intercept => "Intercept",
            Self::MktExcess => crate::columns::MKT_EXCESS,
            Self::Smb => crate::columns::SMB,
            Self::Hml => crate::columns::HML,
            Self::Mom => crate::columns::MOM,
        }
    }
}

/// Fitted coefficients for a single entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientVector {
    /// (coefficient name, value) in row order.
    pub values: Vec<(String, f64)>,
}

impl CoefficientVector {
    /// Create a coefficient vector from ordered pairs.
    #[must_use]
    pub const fn new(values: Vec<(String, f64)>) -> Self {
        Self { values }
    }

    /// Value for a coefficient name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Coefficient names in row order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.values.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of coefficients.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Coefficient table: one row per coefficient, one column per entity.
///
/// Columns keep insertion order. A column missing a row's coefficient holds
/// NaN for that row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientMatrix {
    row_labels: Vec<String>,
    entities: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl CoefficientMatrix {
    /// Create an empty matrix with the given row labels.
    #[must_use]
    pub const fn new(row_labels: Vec<String>) -> Self {
        Self { row_labels, entities: Vec::new(), columns: Vec::new() }
    }

    /// Create an empty matrix with the four-factor row labels.
    #[must_use]
    pub fn four_factor() -> Self {
        Self::new(CoefficientName::ALL.iter().map(|c| c.label().to_string()).collect())
    }

    /// Append an entity's coefficients as the rightmost column.
    pub fn push_column(&mut self, entity: impl Into<String>, coefficients: &CoefficientVector) {
        let column = self
            .row_labels
            .iter()
            .map(|label| coefficients.get(label).unwrap_or(f64::NAN))
            .collect();
        self.entities.push(entity.into());
        self.columns.push(column);
    }

    /// Rename a row. Returns false if no row carries `from`.
    pub fn relabel_row(&mut self, from: &str, to: impl Into<String>) -> bool {
        match self.row_labels.iter_mut().find(|label| *label == from) {
            Some(label) => {
                *label = to.into();
                true
            }
            None => false,
        }
    }

    /// Row labels in order.
    #[must_use]
    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    /// Entity column labels in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Column of values for an entity.
    #[must_use]
    pub fn column(&self, entity: &str) -> Option<&[f64]> {
        self.entities.iter().position(|e| e == entity).map(|i| self.columns[i].as_slice())
    }

    /// Single cell lookup.
    #[must_use]
    pub fn get(&self, row: &str, entity: &str) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        self.column(entity).map(|c| c[r])
    }

    /// Values of one row across all entities, in column order, or `None` if
    /// `index` is past the last row.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.row_labels.len() {
            return None;
        }
        self.columns.iter().map(|c| c.get(index).copied()).collect()
    }

    /// Number of coefficient rows.
    #[must_use]
    pub const fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    /// Number of entity columns.
    #[must_use]
    pub const fn n_columns(&self) -> usize {
        self.entities.len()
    }
}
