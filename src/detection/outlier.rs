//! Statistical outlier scans.
//!
//! These are cheap baselines that need no model: each point is scored against
//! a location/scale estimate of the whole series and flagged when its score
//! exceeds a threshold.

use crate::utils::stats::{mean, median, population_std};

/// Number of population standard deviations beyond which a point is an outlier.
pub const OUTLIER_SIGMA: f64 = 2.5;

/// Scale estimates below this are treated as a constant series.
const MIN_SCALE: f64 = 1e-10;

/// Method for outlier detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlierMethod {
    /// Distance from the mean in population standard deviations.
    ZScore,
    /// Distance from the median in scaled median absolute deviations.
    ModifiedZScore,
    /// Distance beyond the interquartile fences, in IQR units.
    IQR,
}

/// Result of outlier detection.
#[derive(Debug, Clone)]
pub struct OutlierResult {
    /// Indices of detected outliers, ascending.
    pub outlier_indices: Vec<usize>,
    /// Outlier scores for each point (higher = more anomalous).
    pub scores: Vec<f64>,
    /// Score a point must exceed to be flagged.
    pub threshold: f64,
    /// Method used.
    pub method: OutlierMethod,
}

impl OutlierResult {
    fn empty(config: &OutlierConfig) -> Self {
        Self {
            outlier_indices: Vec::new(),
            scores: Vec::new(),
            threshold: config.threshold,
            method: config.method,
        }
    }

    /// Get the number of outliers detected.
    pub fn outlier_count(&self) -> usize {
        self.outlier_indices.len()
    }

    /// Check if a specific index is an outlier.
    pub fn is_outlier(&self, index: usize) -> bool {
        self.outlier_indices.binary_search(&index).is_ok()
    }

    /// Pair each flagged index with its value in `series`.
    pub fn points(&self, series: &[f64]) -> Vec<(usize, f64)> {
        self.outlier_indices
            .iter()
            .filter_map(|&i| series.get(i).map(|&v| (i, v)))
            .collect()
    }
}

/// Configuration for outlier detection.
#[derive(Debug, Clone)]
pub struct OutlierConfig {
    /// Detection method.
    pub method: OutlierMethod,
    /// Threshold (interpretation depends on method).
    pub threshold: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self::z_score(OUTLIER_SIGMA)
    }
}

impl OutlierConfig {
    /// Z-score against the population standard deviation.
    pub fn z_score(threshold: f64) -> Self {
        Self {
            method: OutlierMethod::ZScore,
            threshold,
        }
    }

    /// Modified z-score using the MAD (3.5 is the usual choice).
    pub fn modified_z_score(threshold: f64) -> Self {
        Self {
            method: OutlierMethod::ModifiedZScore,
            threshold,
        }
    }

    /// Tukey fences with the given IQR multiplier (1.5 is the usual choice).
    pub fn iqr(multiplier: f64) -> Self {
        Self {
            method: OutlierMethod::IQR,
            threshold: multiplier,
        }
    }
}

/// Detect outliers in a series of finite values.
pub fn detect_outliers(series: &[f64], config: &OutlierConfig) -> OutlierResult {
    if series.is_empty() {
        return OutlierResult::empty(config);
    }

    let (scores, threshold) = match config.method {
        OutlierMethod::ZScore => (z_scores(series), config.threshold),
        OutlierMethod::ModifiedZScore => (modified_z_scores(series), config.threshold),
        // Fence distance is already net of the multiplier; anything beyond is flagged.
        OutlierMethod::IQR => (iqr_scores(series, config.threshold), 0.0),
    };

    let outlier_indices = scores
        .iter()
        .enumerate()
        .filter(|(_, &score)| score > threshold)
        .map(|(i, _)| i)
        .collect();

    OutlierResult {
        outlier_indices,
        scores,
        threshold,
        method: config.method,
    }
}

fn z_scores(series: &[f64]) -> Vec<f64> {
    let m = mean(series);
    let sd = population_std(series);
    if sd < MIN_SCALE {
        return vec![0.0; series.len()];
    }
    series.iter().map(|x| (x - m).abs() / sd).collect()
}

fn modified_z_scores(series: &[f64]) -> Vec<f64> {
    let med = median(series);
    let deviations: Vec<f64> = series.iter().map(|x| (x - med).abs()).collect();

    // 0.6745 is the 0.75 quantile of the standard normal.
    let scaled_mad = median(&deviations) / 0.6745;
    if scaled_mad < MIN_SCALE {
        return vec![0.0; series.len()];
    }
    deviations.iter().map(|d| d / scaled_mad).collect()
}

fn iqr_scores(series: &[f64], multiplier: f64) -> Vec<f64> {
    let n = series.len();
    if n < 4 {
        return vec![0.0; n];
    }

    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = (q3 - q1).max(MIN_SCALE);

    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    series
        .iter()
        .map(|&x| {
            if x < lower {
                (lower - x) / iqr
            } else if x > upper {
                (x - upper) / iqr
            } else {
                0.0
            }
        })
        .collect()
}
