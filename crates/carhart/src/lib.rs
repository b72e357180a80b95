//! # carhart
//!
//! Fama-French-Carhart four-factor regressions in Rust.
//!
//! This crate provides a unified interface to the carhart workspace.
//! Individual components can be enabled via feature flags.
//!
//! ## Features
//!
//! - `full` (default): Enables all components
//! - `primitives`: Core type definitions
//! - `traits`: Source and sink abstractions
//! - `math`: Least squares and linear solves
//! - `panel`: Factor normalization, returns and alignment
//! - `model`: Regression and batch orchestration
//! - `io`: French library files, Yahoo Finance and CSV output
//! - `cli`: The `carhart` command-line tool
//!
//! ## Example
//!
//! ```rust,ignore
//! use carhart::io::{CsvSink, FrenchFactorFiles, YahooPriceSource};
//! use carhart::model::{BatchConfig, BatchRunner};
//!
//! let runner = BatchRunner::new(FrenchFactorFiles::from_dir("data"), YahooPriceSource::new()?);
//! let config = BatchConfig::new(["AAPL", "MSFT"], start, end);
//! let output = runner.run_into(&config, &mut CsvSink::new("coefficients.csv"))?;
//! ```

#![doc(
    html_logo_url = "https://raw.githubusercontent.com/factordynamics/carhart-rs/main/assets/logo.png",
    html_favicon_url = "https://raw.githubusercontent.com/factordynamics/carhart-rs/main/assets/favicon.ico"
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[cfg(feature = "primitives")]
#[doc(inline)]
pub use carhart_primitives as primitives;
#[cfg(feature = "traits")]
#[doc(inline)]
pub use carhart_traits as traits;
#[cfg(feature = "math")]
#[doc(inline)]
pub use carhart_math as math;
#[cfg(feature = "panel")]
#[doc(inline)]
pub use carhart_panel as panel;
#[cfg(feature = "model")]
#[doc(inline)]
pub use carhart_model as model;
#[cfg(feature = "io")]
#[doc(inline)]
pub use carhart_io as io;

// Used by the `carhart` binary only.
#[cfg(feature = "cli")]
use clap as _;
#[cfg(feature = "cli")]
use tracing as _;
#[cfg(feature = "cli")]
use tracing_subscriber as _;
