#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod coefficients;
pub use coefficients::{CoefficientMatrix, CoefficientName, CoefficientVector};

mod failure;
pub use failure::{FailureKind, FailureRecord};

mod factor;
pub use factor::{FactorTables, RawFactorRow, RawFactorTable, columns};

mod period;
pub use period::{ResamplePeriod, month_end, parse_month_key};

mod prices;
pub use prices::{PricePoint, PriceSeries};

/// Re-export common date type.
pub type Date = chrono::NaiveDate;
