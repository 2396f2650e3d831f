//! Anomaly detection with a trend and a seasonal Gaussian process.
//!
//! - [`DetectorConfig`]: hyperparameters of both components, JSON-compatible
//! - [`Detector`]: fits the two-stage model and scores points against it

mod config;
#[allow(clippy::module_inception)]
mod detector;

pub use config::{
    ComponentConfig, DetectorConfig, KernelKind, DEFAULT_LENGTH_SCALE, DEFAULT_PERIOD,
    DEFAULT_SIGMA_F,
};
pub use detector::{AnomalyScores, Detector};
