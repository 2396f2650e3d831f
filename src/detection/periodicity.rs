//! Period inference.
//!
//! Two detectors are provided:
//! - [`AcfPeriodDetector`]: local maxima of the autocorrelation function,
//!   with harmonic filtering. This is the heuristic behind [`infer_period`].
//! - [`SpectralPeriodDetector`]: periodogram peaks above a noise floor.
//!
//! Both remove a least-squares line first so that a trend does not swamp the
//! seasonal signal.

use tracing::debug;

use super::fft::periodogram_peaks;
use crate::error::{OddityError, Result};
use crate::utils::stats::detrend_linear;

/// A candidate period with its detection score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedPeriod {
    /// Period in samples.
    pub period: usize,
    /// ACF value or spectral power, depending on the detector.
    pub score: f64,
}

/// Candidates ordered strongest first.
#[derive(Debug, Clone, Default)]
pub struct PeriodicityResult {
    pub periods: Vec<DetectedPeriod>,
}

impl PeriodicityResult {
    /// The strongest period, if any.
    pub fn primary_period(&self) -> Option<usize> {
        self.periods.first().map(|p| p.period)
    }

    pub fn has_periodicity(&self) -> bool {
        !self.periods.is_empty()
    }
}

/// Common interface of the period detectors.
pub trait PeriodicityDetector {
    fn detect(&self, series: &[f64]) -> PeriodicityResult;

    fn name(&self) -> &'static str;
}

/// Autocorrelation peak detector.
#[derive(Debug, Clone)]
pub struct AcfPeriodDetector {
    /// Smallest lag considered.
    pub min_period: usize,
    /// Largest lag considered (further capped at `n / 2`).
    pub max_period: usize,
    /// An ACF peak must exceed this to count.
    pub correlation_threshold: f64,
}

impl Default for AcfPeriodDetector {
    fn default() -> Self {
        Self {
            min_period: 2,
            max_period: 365,
            correlation_threshold: 0.3,
        }
    }
}

impl AcfPeriodDetector {
    pub fn with_min_period(mut self, min: usize) -> Self {
        self.min_period = min.max(1);
        self
    }

    pub fn with_max_period(mut self, max: usize) -> Self {
        self.max_period = max;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Biased ACF (divisor `n`) for lags `0..=max_lag`.
    fn acf(series: &[f64], max_lag: usize) -> Vec<f64> {
        let n = series.len();
        let mean = series.iter().sum::<f64>() / n as f64;
        let var = series.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        if var < 1e-10 {
            return vec![0.0; max_lag + 1];
        }

        (0..=max_lag)
            .map(|lag| {
                let cov: f64 = series
                    .iter()
                    .zip(series.iter().skip(lag))
                    .map(|(a, b)| (a - mean) * (b - mean))
                    .sum();
                cov / var
            })
            .collect()
    }

    fn peaks(&self, acf: &[f64]) -> Vec<(usize, f64)> {
        let upper = acf.len().saturating_sub(1).min(self.max_period + 1);
        let mut peaks: Vec<(usize, f64)> = (self.min_period.max(1)..upper)
            .filter(|&i| {
                acf[i] > acf[i - 1] && acf[i] >= acf[i + 1] && acf[i] > self.correlation_threshold
            })
            .map(|i| (i, acf[i]))
            .collect();
        peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        peaks
    }
}

/// Drop candidates that are integer multiples of an already kept period.
fn filter_harmonics(candidates: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    let mut kept: Vec<(usize, f64)> = Vec::new();
    for (period, score) in candidates {
        let harmonic = kept.iter().any(|&(base, _)| {
            let ratio = period as f64 / base as f64;
            ratio.round() > 1.0 && (ratio - ratio.round()).abs() < 0.1
        });
        if !harmonic {
            kept.push((period, score));
        }
    }
    kept
}

impl PeriodicityDetector for AcfPeriodDetector {
    fn detect(&self, series: &[f64]) -> PeriodicityResult {
        let n = series.len();
        if n < 2 * self.min_period.max(2) {
            return PeriodicityResult::default();
        }

        let detrended = detrend_linear(series);
        let acf = Self::acf(&detrended, n / 2);
        let periods = filter_harmonics(self.peaks(&acf))
            .into_iter()
            .map(|(period, score)| DetectedPeriod { period, score })
            .collect();

        PeriodicityResult { periods }
    }

    fn name(&self) -> &'static str {
        "acf"
    }
}

/// Periodogram peak detector.
#[derive(Debug, Clone)]
pub struct SpectralPeriodDetector {
    pub min_period: usize,
    pub max_period: usize,
    /// Peaks must exceed this multiple of the median power.
    pub threshold: f64,
}

impl Default for SpectralPeriodDetector {
    fn default() -> Self {
        Self {
            min_period: 2,
            max_period: 365,
            threshold: 3.0,
        }
    }
}

impl SpectralPeriodDetector {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.max(1.0);
        self
    }
}

impl PeriodicityDetector for SpectralPeriodDetector {
    fn detect(&self, series: &[f64]) -> PeriodicityResult {
        let detrended = detrend_linear(series);
        let max_period = self.max_period.min(series.len() / 2);
        let periods = periodogram_peaks(&detrended, self.threshold, self.min_period, max_period)
            .into_iter()
            .map(|(period, score)| DetectedPeriod { period, score })
            .collect();
        PeriodicityResult { periods }
    }

    fn name(&self) -> &'static str {
        "spectral"
    }
}

/// Infer the dominant period of a series with the default ACF detector.
///
/// Fails with [`OddityError::PeriodNotFound`] when the series is shorter than
/// two minimal periods, when no ACF peak clears the threshold, or when the
/// series does not span two full cycles of the detected period.
pub fn infer_period(series: &[f64]) -> Result<usize> {
    infer_period_with(series, &AcfPeriodDetector::default())
}

/// Infer the dominant period with an explicit detector.
pub fn infer_period_with<D: PeriodicityDetector>(series: &[f64], detector: &D) -> Result<usize> {
    let n = series.len();
    if n < 4 {
        return Err(OddityError::PeriodNotFound(format!(
            "series of length {n} is shorter than two minimal periods"
        )));
    }

    let result = detector.detect(series);
    let period = result.primary_period().ok_or_else(|| {
        OddityError::PeriodNotFound(format!("{} detector found no periodic peak", detector.name()))
    })?;

    if n < 2 * period {
        return Err(OddityError::PeriodNotFound(format!(
            "series of length {n} does not cover two cycles of period {period}"
        )));
    }

    debug!(
        detector = detector.name(),
        period,
        candidates = result.periods.len(),
        "inferred period"
    );
    Ok(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn seasonal(n: usize, period: usize, slope: f64) -> Vec<f64> {
        (0..n)
            .map(|i| slope * i as f64 + 5.0 * (2.0 * PI * i as f64 / period as f64).sin())
            .collect()
    }

    #[test]
    fn acf_detects_sine_period() {
        let series = seasonal(120, 12, 0.0);
        assert_eq!(infer_period(&series).unwrap(), 12);
    }

    #[test]
    fn acf_detects_period_under_trend() {
        let series = seasonal(140, 7, 0.5);
        assert_eq!(infer_period(&series).unwrap(), 7);
    }

    #[test]
    fn acf_detects_alternation() {
        let series = vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0];
        assert_eq!(infer_period(&series).unwrap(), 2);
    }

    #[test]
    fn harmonics_are_filtered() {
        let filtered = filter_harmonics(vec![(12, 0.9), (24, 0.8), (7, 0.5), (36, 0.7)]);
        let periods: Vec<usize> = filtered.iter().map(|p| p.0).collect();
        assert_eq!(periods, vec![12, 7]);
    }

    #[test]
    fn constant_series_has_no_period() {
        let err = infer_period(&[3.0; 50]).unwrap_err();
        assert!(matches!(err, OddityError::PeriodNotFound(_)));
    }

    #[test]
    fn short_series_has_no_period() {
        let err = infer_period(&[1.0, 2.0, 1.0]).unwrap_err();
        assert!(matches!(err, OddityError::PeriodNotFound(_)));
    }

    #[test]
    fn linear_series_has_no_period() {
        let series: Vec<f64> = (0..60).map(|i| 2.0 * i as f64).collect();
        assert!(infer_period(&series).is_err());
    }

    #[test]
    fn spectral_detector_agrees_on_clean_sine() {
        let series = seasonal(128, 16, 0.0);
        let detector = SpectralPeriodDetector::default();
        assert_eq!(infer_period_with(&series, &detector).unwrap(), 16);
        assert_eq!(detector.name(), "spectral");
    }
}
