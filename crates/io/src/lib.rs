#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod french;
pub use french::{FrenchFactorFiles, MOMENTUM_FILE, THREE_FACTOR_FILE, parse_french_csv};

mod french_library;
pub use french_library::{FrenchLibrarySource, MOMENTUM_URL, THREE_FACTOR_URL, extract_csv};

mod memory;
pub use memory::{StaticFactorSource, StaticPriceSource};

mod yahoo;
pub use yahoo::{YahooConfig, YahooPriceSource};

mod csv_sink;
pub use csv_sink::{CsvSink, coefficients_csv, failures_csv};

mod error;
pub use error::IoError;
