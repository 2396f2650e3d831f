//! Statistical helpers shared by the series, detection and decomposition modules.

pub mod stats;

pub use stats::{mean, median, population_std, population_variance, quantile_normal};
