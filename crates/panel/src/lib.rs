#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/carhart-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod dates;
pub use dates::{date_column, f64_column, from_epoch_days, to_epoch_days};

mod normalize;
pub use normalize::{FactorSeries, normalize_factors, normalize_table};

mod returns;
pub use returns::{ReturnSeries, compute_returns};

mod align;
pub use align::{AlignedPanel, align};

mod error;
pub use error::PanelError;
