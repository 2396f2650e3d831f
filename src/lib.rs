//! # oddity
//!
//! Time series anomaly detection with Gaussian process regression.
//!
//! A smooth Gaussian process models the trend, a periodic one models the
//! seasonal part of what remains, and points far from the combined posterior
//! mean are reported as anomalies. Classical decomposition, period inference
//! and simple outlier rules are provided as standalone utilities.

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod detection;
pub mod detector;
pub mod error;
pub mod gp;
pub mod seasonality;
pub mod utils;

pub use error::{OddityError, Result};

pub mod prelude {
    pub use crate::core::TimeSeries;
    pub use crate::detection::{detect_outliers, infer_period, OutlierConfig, OutlierMethod};
    pub use crate::detector::{ComponentConfig, Detector, DetectorConfig, KernelKind};
    pub use crate::error::{OddityError, Result};
    pub use crate::gp::{GaussianProcess, Kernel, Posterior};
    pub use crate::seasonality::{decompose, Decomposition};
    pub use crate::utils::quantile_normal;
}
