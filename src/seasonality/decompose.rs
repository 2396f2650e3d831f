//! Classical additive decomposition.
//!
//! Splits a series into:
//! - Trend: centred moving average over one period
//! - Seasonal: per-phase mean of the detrended series, tiled
//! - Residual: what is left after removing both
//!
//! This is a diagnostic utility and independent of the Gaussian process model.

use tracing::debug;

use crate::core::TimeSeries;
use crate::detection::infer_period;
use crate::error::{OddityError, Result};
use crate::utils::stats;

/// Result of an additive decomposition.
///
/// For every index `i`, `trend[i] + seasonal[i] + residual[i]` reproduces the
/// input up to floating-point rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Trend component.
    pub trend: TimeSeries,
    /// Seasonal component, periodic with `period`.
    pub seasonal: TimeSeries,
    /// Residual component.
    pub residual: TimeSeries,
    /// Period used, whether supplied or inferred.
    pub period: usize,
}

impl Decomposition {
    /// Seasonal strength in `[0, 1]`; close to 1 means strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        strength(self.seasonal.values(), self.residual.values())
    }

    /// Trend strength in `[0, 1]`; close to 1 means a strong trend.
    pub fn trend_strength(&self) -> f64 {
        strength(self.trend.values(), self.residual.values())
    }

    /// Split into `(trend, seasonal, residual)`.
    pub fn into_parts(self) -> (TimeSeries, TimeSeries, TimeSeries) {
        (self.trend, self.seasonal, self.residual)
    }
}

/// `1 - Var(residual) / Var(component + residual)`, clamped to `[0, 1]`.
fn strength(component: &[f64], residual: &[f64]) -> f64 {
    let combined: Vec<f64> = component
        .iter()
        .zip(residual.iter())
        .map(|(c, r)| c + r)
        .collect();
    let var_combined = stats::population_variance(&combined);
    if var_combined < 1e-10 {
        return 0.0;
    }
    (1.0 - stats::population_variance(residual) / var_combined).clamp(0.0, 1.0)
}

/// Decompose `series` into trend, seasonal and residual components.
///
/// When `period` is `None` it is inferred from the autocorrelation function
/// (see [`infer_period`]).
///
/// # Errors
/// - [`OddityError::InvalidHyperparameter`] if `period` is `Some(0)`.
/// - [`OddityError::PeriodNotFound`] if no period can be inferred or the
///   series is shorter than two periods.
pub fn decompose(series: &TimeSeries, period: Option<usize>) -> Result<Decomposition> {
    let values = series.values();
    let n = values.len();

    let period = match period {
        Some(0) => {
            return Err(OddityError::InvalidHyperparameter(
                "period must be at least 1".to_string(),
            ))
        }
        Some(p) => p,
        None => infer_period(values)?,
    };

    if n < 2 * period {
        return Err(OddityError::PeriodNotFound(format!(
            "series of length {n} is shorter than two periods of {period}"
        )));
    }

    let trend = centred_moving_average(values, period);
    let detrended: Vec<f64> = values.iter().zip(&trend).map(|(x, t)| x - t).collect();
    let seasonal = seasonal_profile(&detrended, period);
    let residual: Vec<f64> = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((x, t), s)| x - t - s)
        .collect();

    debug!(n, period, "decomposed series");

    Ok(Decomposition {
        trend: TimeSeries::new(trend)?,
        seasonal: TimeSeries::new(seasonal)?,
        residual: TimeSeries::new(residual)?,
        period,
    })
}

/// Centred moving average spanning one period.
///
/// Odd periods use `period` equal weights. Even periods use the `2 x period`
/// average: `period + 1` points with half weight at both ends. Near the
/// edges the window is truncated and the remaining weights renormalised.
fn centred_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;
    let even = period % 2 == 0;

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);

            // Running weighted mean; a plain sum overflows near f64::MAX.
            let mut average = 0.0;
            let mut weight = 0.0;
            for (j, &v) in values.iter().enumerate().take(end).skip(start) {
                let w = if even && half > 0 && j.abs_diff(i) == half {
                    0.5
                } else {
                    1.0
                };
                weight += w;
                average += (w / weight) * (v - average);
            }
            average
        })
        .collect()
}

/// Per-phase means of `detrended`, centred to sum to zero over one period,
/// tiled to the input length.
fn seasonal_profile(detrended: &[f64], period: usize) -> Vec<f64> {
    let mut means = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, &d) in detrended.iter().enumerate() {
        let phase = i % period;
        counts[phase] += 1;
        means[phase] += (d - means[phase]) / counts[phase] as f64;
    }
    let offset = stats::mean(&means);

    (0..detrended.len())
        .map(|i| means[i % period] - offset)
        .collect()
}
