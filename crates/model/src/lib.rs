#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod regression;
pub use regression::{CarhartRegression, RegressionConfig, RegressionFit};

mod batch;
pub use batch::{BatchConfig, BatchOutput, BatchRunner, DEFAULT_INTERCEPT_LABEL};
pub use carhart_primitives::{FailureKind, FailureRecord};

mod error;
pub use error::ModelError;

/// Re-export commonly used types.
pub mod prelude {
    pub use carhart_traits::{CoefficientSink, FactorSource, PriceSource};

    pub use super::{BatchConfig, BatchOutput, BatchRunner, CarhartRegression, ModelError};
}
