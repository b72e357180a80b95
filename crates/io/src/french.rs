//! Kenneth R. French data library factor files.
//!
//! The published CSVs open with a few lines of description, then a header
//! row whose first cell is empty (`,Mkt-RF,SMB,HML,RF`), then one row per
//! `YYYYMM` month. Annual tables and a copyright line follow the monthly
//! block. Every row after the header is returned; the normalizer cuts the
//! table at the first row that is not monthly data.

use std::path::{Path, PathBuf};

use carhart_primitives::{FactorTables, RawFactorRow, RawFactorTable};
use carhart_traits::{FactorSource, SourceError};

use crate::IoError;

/// File name of the extracted 3-factor research data.
pub const THREE_FACTOR_FILE: &str = "F-F_Research_Data_Factors.CSV";

/// File name of the extracted momentum factor data.
pub const MOMENTUM_FILE: &str = "F-F_Momentum_Factor.CSV";

/// Parse the text of one factor file.
///
/// Column labels are kept as written, trailing whitespace included. Cells
/// that are blank or not numeric become `None`.
///
/// # Errors
/// Returns `MissingHeader` if no row has an empty first cell followed by
/// labels, or a CSV error if the text cannot be tokenized.
pub fn parse_french_csv(text: &str, source_name: &str) -> Result<RawFactorTable, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        match &columns {
            None => {
                if is_header(&record) {
                    columns = Some(record.iter().skip(1).map(str::to_string).collect());
                }
            }
            Some(labels) => {
                let key = record.get(0).unwrap_or_default().trim();
                let values = (1..=labels.len())
                    .map(|i| record.get(i).and_then(|cell| cell.trim().parse::<f64>().ok()))
                    .collect();
                rows.push(RawFactorRow::new(key, values));
            }
        }
    }

    let columns = columns.ok_or_else(|| IoError::MissingHeader(source_name.to_string()))?;
    tracing::debug!(
        source = source_name,
        columns = columns.len(),
        rows = rows.len(),
        "parsed factor file"
    );
    Ok(RawFactorTable::new(columns, rows))
}

fn is_header(record: &csv::StringRecord) -> bool {
    record.len() >= 2
        && record.get(0).is_some_and(|c| c.trim().is_empty())
        && record.iter().skip(1).all(|c| !c.trim().is_empty())
}

/// Factor source reading the extracted French library CSV files.
#[derive(Debug, Clone)]
pub struct FrenchFactorFiles {
    three_factor: PathBuf,
    momentum: PathBuf,
}

impl FrenchFactorFiles {
    /// Use explicit paths for the two files.
    pub fn new(three_factor: impl Into<PathBuf>, momentum: impl Into<PathBuf>) -> Self {
        Self { three_factor: three_factor.into(), momentum: momentum.into() }
    }

    /// Use the published file names inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(THREE_FACTOR_FILE), dir.join(MOMENTUM_FILE))
    }

    /// Path of the 3-factor file.
    #[must_use]
    pub fn three_factor_path(&self) -> &Path {
        &self.three_factor
    }

    /// Path of the momentum file.
    #[must_use]
    pub fn momentum_path(&self) -> &Path {
        &self.momentum
    }

    fn read(path: &Path) -> Result<RawFactorTable, IoError> {
        let text = std::fs::read_to_string(path)?;
        parse_french_csv(&text, &path.display().to_string())
    }
}

impl FactorSource for FrenchFactorFiles {
    fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
        let three_factor = Self::read(&self.three_factor)?;
        let momentum = Self::read(&self.momentum)?;
        Ok(FactorTables::new(three_factor, momentum))
    }

    fn name(&self) -> &str {
        "french-files"
    }
}
