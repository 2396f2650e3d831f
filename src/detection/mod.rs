//! Model-free detection utilities.
//!
//! This module provides tools for detecting:
//! - Outliers against whole-series location/scale estimates
//! - The dominant seasonal period

mod fft;
mod outlier;
mod periodicity;

pub use fft::{magnitude_spectrum, periodogram, periodogram_peaks};
pub use outlier::{detect_outliers, OutlierConfig, OutlierMethod, OutlierResult, OUTLIER_SIGMA};
pub use periodicity::{
    infer_period, infer_period_with, AcfPeriodDetector, DetectedPeriod, PeriodicityDetector,
    PeriodicityResult, SpectralPeriodDetector,
};
