//! Two-stage Gaussian process detector.
//!
//! Fitting runs a trend process on the raw series, subtracts its posterior
//! mean and runs a seasonal process on what remains. The combined posterior
//! mean is the expected behaviour of the series; points far from it relative
//! to the seasonal uncertainty are anomalies.

use nalgebra::DMatrix;
use tracing::{debug, info};

use super::config::DetectorConfig;
use crate::core::TimeSeries;
use crate::error::{OddityError, Result};
use crate::gp::{GaussianProcess, Kernel, Posterior};
use crate::utils::quantile_normal;

#[derive(Debug, Clone, PartialEq)]
struct FittedModel {
    trend: Posterior,
    seasonal: Posterior,
    seasonal_kernel: Kernel,
    seasonal_sigma_y: f64,
    mu: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Unfitted,
    Fitted(FittedModel),
}

/// Per-point anomaly scores against a fitted detector.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScores {
    /// `y[i] - mu[i]`.
    pub residuals: Vec<f64>,
    /// `|residual| / sqrt(cov[i][i] + sigma_y^2)` with the seasonal noise level.
    pub scores: Vec<f64>,
}

impl AnomalyScores {
    /// Indices whose score exceeds `threshold`, ascending.
    pub fn above(&self, threshold: f64) -> Vec<usize> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index and value of the largest score.
    pub fn max(&self) -> Option<(usize, f64)> {
        self.scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Trend plus seasonal Gaussian process anomaly detector.
///
/// # Example
/// ```
/// use oddity::core::TimeSeries;
/// use oddity::detector::{ComponentConfig, Detector, DetectorConfig};
///
/// let values: Vec<f64> = (0..48)
///     .map(|i| 5.0 + (i as f64 * std::f64::consts::PI / 3.0).sin())
///     .collect();
/// let series = TimeSeries::new(values).unwrap();
///
/// let config = DetectorConfig::default()
///     .with_seasonal(ComponentConfig::periodic(0.25).with_period(6.0));
/// let mut detector = Detector::new(config).unwrap();
/// detector.fit(&series).unwrap();
///
/// assert_eq!(detector.mu().unwrap().len(), 48);
/// assert_eq!(detector.cov().unwrap().shape(), (48, 48));
/// ```
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
    state: State,
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            config: DetectorConfig::default(),
            state: State::Unfitted,
        }
    }
}

impl Detector {
    /// Create an unfitted detector after validating `config`.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: State::Unfitted,
        })
    }

    /// Create an unfitted detector from a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        DetectorConfig::from_json(json).map(|config| Self {
            config,
            state: State::Unfitted,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, State::Fitted(_))
    }

    /// Fit both components to `series`, replacing any earlier fit.
    ///
    /// On error the detector keeps whatever state it had before the call.
    pub fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let trend_kernel = self.config.trend.kernel_for(series.values())?;
        let trend_gp = GaussianProcess::new(trend_kernel, self.config.trend.sigma_y)?;
        let trend = trend_gp.fit(series)?;

        let detrended = series.sub_values(trend.mean())?;
        let seasonal_kernel = self.config.seasonal.kernel_for(detrended.values())?;
        let seasonal_gp = GaussianProcess::new(seasonal_kernel, self.config.seasonal.sigma_y)?;
        let seasonal = seasonal_gp.fit(&detrended)?;

        let mu: Vec<f64> = trend
            .mean()
            .iter()
            .zip(seasonal.mean())
            .map(|(t, s)| t + s)
            .collect();

        info!(
            n = series.len(),
            trend_kernel = trend_kernel.name(),
            seasonal_kernel = seasonal_kernel.name(),
            period = seasonal_kernel.period(),
            "detector fitted"
        );

        self.state = State::Fitted(FittedModel {
            trend,
            seasonal,
            seasonal_kernel,
            seasonal_sigma_y: seasonal_gp.sigma_y(),
            mu,
        });
        Ok(())
    }

    fn model(&self) -> Result<&FittedModel> {
        match &self.state {
            State::Fitted(model) => Ok(model),
            State::Unfitted => Err(OddityError::NotFitted),
        }
    }

    /// Combined posterior mean of trend and seasonal components.
    pub fn mu(&self) -> Result<Vec<f64>> {
        self.model().map(|m| m.mu.clone())
    }

    /// Posterior covariance of the seasonal component.
    ///
    /// The trend covariance is not added; the trend is treated as a fixed
    /// offset once it has been subtracted.
    pub fn cov(&self) -> Result<&DMatrix<f64>> {
        self.model().map(|m| m.seasonal.covariance())
    }

    pub fn trend(&self) -> Result<&Posterior> {
        self.model().map(|m| &m.trend)
    }

    pub fn seasonal(&self) -> Result<&Posterior> {
        self.model().map(|m| &m.seasonal)
    }

    /// Seasonal kernel as fitted, including an inferred period.
    pub fn seasonal_kernel(&self) -> Result<&Kernel> {
        self.model().map(|m| &m.seasonal_kernel)
    }

    /// Score every point of `series` against the fitted posterior.
    ///
    /// `series` must have the length of the series the detector was fitted on.
    pub fn score(&self, series: &TimeSeries) -> Result<AnomalyScores> {
        let model = self.model()?;
        if series.len() != model.mu.len() {
            return Err(OddityError::DimensionMismatch {
                expected: model.mu.len(),
                got: series.len(),
            });
        }

        let noise = model.seasonal_sigma_y * model.seasonal_sigma_y;
        let cov = model.seasonal.covariance();
        let residuals: Vec<f64> = series.iter().zip(&model.mu).map(|(y, m)| y - m).collect();
        let scores = residuals
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let sd = (cov[(i, i)] + noise).sqrt();
                if sd > 0.0 {
                    r.abs() / sd
                } else if *r == 0.0 {
                    0.0
                } else {
                    f64::INFINITY
                }
            })
            .collect();

        Ok(AnomalyScores { residuals, scores })
    }

    /// Points whose score exceeds `threshold`, as `(index, value)` pairs.
    pub fn anomalies(&self, series: &TimeSeries, threshold: f64) -> Result<Vec<(usize, f64)>> {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(OddityError::InvalidHyperparameter(format!(
                "threshold must be non-negative, got {threshold}"
            )));
        }
        let scores = self.score(series)?;
        let flagged: Vec<(usize, f64)> = scores
            .above(threshold)
            .into_iter()
            .map(|i| (i, series.values()[i]))
            .collect();
        debug!(threshold, flagged = flagged.len(), "scored series");
        Ok(flagged)
    }

    /// Points outside the two-sided normal interval at `confidence`.
    pub fn anomalies_at(&self, series: &TimeSeries, confidence: f64) -> Result<Vec<(usize, f64)>> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(OddityError::InvalidHyperparameter(format!(
                "confidence must lie in (0, 1), got {confidence}"
            )));
        }
        self.anomalies(series, quantile_normal((1.0 + confidence) / 2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{ComponentConfig, DEFAULT_PERIOD};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn seasonal_values(n: usize, period: f64, level: f64) -> Vec<f64> {
        (0..n)
            .map(|i| level + 0.05 * i as f64 + 3.0 * (2.0 * PI * i as f64 / period).sin())
            .collect()
    }

    fn config_with_period(period: f64) -> DetectorConfig {
        DetectorConfig::default().with_seasonal(ComponentConfig::periodic(0.25).with_period(period))
    }

    #[test]
    fn unfitted_detector_reports_not_fitted() {
        let detector = Detector::default();
        assert!(!detector.is_fitted());
        assert_eq!(detector.mu(), Err(OddityError::NotFitted));
        assert!(matches!(detector.cov(), Err(OddityError::NotFitted)));
        assert!(matches!(detector.trend(), Err(OddityError::NotFitted)));
        let series = TimeSeries::new(vec![1.0, 2.0]).unwrap();
        assert!(matches!(detector.score(&series), Err(OddityError::NotFitted)));
    }

    #[test]
    fn fit_produces_posterior_of_series_length() {
        let series = TimeSeries::new(seasonal_values(64, 8.0, 10.0)).unwrap();
        let mut detector = Detector::new(config_with_period(8.0)).unwrap();
        detector.fit(&series).unwrap();

        assert!(detector.is_fitted());
        let mu = detector.mu().unwrap();
        assert_eq!(mu.len(), 64);
        assert_eq!(detector.cov().unwrap().shape(), (64, 64));

        let mae: f64 = mu
            .iter()
            .zip(series.iter())
            .map(|(m, y)| (m - y).abs())
            .sum::<f64>()
            / 64.0;
        assert!(mae < 1.0, "mean absolute error {mae}");
    }

    #[test]
    fn mu_is_sum_of_component_means() {
        let series = TimeSeries::new(seasonal_values(40, 5.0, 2.0)).unwrap();
        let mut detector = Detector::new(config_with_period(5.0)).unwrap();
        detector.fit(&series).unwrap();

        let mu = detector.mu().unwrap();
        let trend = detector.trend().unwrap().mean();
        let seasonal = detector.seasonal().unwrap().mean();
        for i in 0..40 {
            assert_relative_eq!(mu[i], trend[i] + seasonal[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn cov_is_seasonal_component_only() {
        let series = TimeSeries::new(seasonal_values(32, 4.0, 0.0)).unwrap();
        let mut detector = Detector::new(config_with_period(4.0)).unwrap();
        detector.fit(&series).unwrap();

        let cov = detector.cov().unwrap();
        assert_eq!(cov, detector.seasonal().unwrap().covariance());
        assert_ne!(cov, detector.trend().unwrap().covariance());
        for i in 0..32 {
            assert!(cov[(i, i)] >= 0.0);
            for j in 0..32 {
                assert_relative_eq!(cov[(i, j)], cov[(j, i)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn refit_replaces_previous_model() {
        let mut detector = Detector::new(config_with_period(8.0)).unwrap();
        detector
            .fit(&TimeSeries::new(seasonal_values(48, 8.0, 0.0)).unwrap())
            .unwrap();
        let first = detector.mu().unwrap();

        let shifted = TimeSeries::new(seasonal_values(48, 8.0, 20.0)).unwrap();
        detector.fit(&shifted).unwrap();
        let second = detector.mu().unwrap();

        assert_eq!(second.len(), 48);
        assert_ne!(first, second);
        let shift = (second.iter().sum::<f64>() - first.iter().sum::<f64>()) / 48.0;
        assert!(shift > 10.0, "mean shift {shift}");
    }

    #[test]
    fn refit_with_new_period_replaces_covariance() {
        let mut detector = Detector::default();
        detector
            .fit(&TimeSeries::new(seasonal_values(96, 12.0, 0.0)).unwrap())
            .unwrap();
        let first = detector.cov().unwrap().clone();
        assert_eq!(detector.seasonal_kernel().unwrap().period(), Some(12.0));

        detector
            .fit(&TimeSeries::new(seasonal_values(96, 8.0, 0.0)).unwrap())
            .unwrap();
        assert_eq!(detector.seasonal_kernel().unwrap().period(), Some(8.0));

        let second = detector.cov().unwrap();
        assert_eq!(second.shape(), first.shape());
        assert_ne!(second, &first);
    }

    #[test]
    fn failed_fit_keeps_previous_state() {
        let mut detector = Detector::new(config_with_period(8.0)).unwrap();
        assert!(matches!(
            detector.fit(&TimeSeries::empty()),
            Err(OddityError::EmptySeries)
        ));
        assert!(!detector.is_fitted());

        let series = TimeSeries::new(seasonal_values(48, 8.0, 1.0)).unwrap();
        detector.fit(&series).unwrap();
        let before = detector.mu().unwrap();

        assert!(detector.fit(&TimeSeries::empty()).is_err());
        assert_eq!(detector.mu().unwrap(), before);
    }

    #[test]
    fn period_is_inferred_when_not_configured() {
        let series = TimeSeries::new(seasonal_values(96, 12.0, 5.0)).unwrap();
        let mut detector = Detector::default();
        detector.fit(&series).unwrap();
        assert_eq!(detector.seasonal_kernel().unwrap().period(), Some(12.0));
    }

    #[test]
    fn default_period_is_used_when_inference_fails() {
        for values in [vec![1.0, 2.0, 3.0], vec![4.0]] {
            let n = values.len();
            let mut detector = Detector::default();
            detector.fit(&TimeSeries::new(values).unwrap()).unwrap();

            assert!(detector.is_fitted());
            assert_eq!(
                detector.seasonal_kernel().unwrap().period(),
                Some(DEFAULT_PERIOD)
            );
            assert_eq!(detector.mu().unwrap().len(), n);
        }
    }

    #[test]
    fn spike_has_the_highest_score() {
        let mut values = seasonal_values(64, 8.0, 10.0);
        values[30] += 15.0;
        let series = TimeSeries::new(values).unwrap();

        let mut detector = Detector::new(config_with_period(8.0)).unwrap();
        detector.fit(&series).unwrap();

        let scores = detector.score(&series).unwrap();
        assert_eq!(scores.len(), 64);
        assert_eq!(scores.max().map(|(i, _)| i), Some(30));

        let flagged = detector.anomalies(&series, 3.0).unwrap();
        assert!(flagged.iter().any(|&(i, v)| i == 30 && v == series.values()[30]));
        assert!(!detector.anomalies_at(&series, 0.99).unwrap().is_empty());
    }

    #[test]
    fn scoring_rejects_mismatched_lengths_and_bad_thresholds() {
        let series = TimeSeries::new(seasonal_values(32, 4.0, 0.0)).unwrap();
        let mut detector = Detector::new(config_with_period(4.0)).unwrap();
        detector.fit(&series).unwrap();

        let shorter = TimeSeries::new(seasonal_values(31, 4.0, 0.0)).unwrap();
        assert_eq!(
            detector.score(&shorter),
            Err(OddityError::DimensionMismatch {
                expected: 32,
                got: 31
            })
        );
        assert!(detector.anomalies(&series, -1.0).is_err());
        assert!(detector.anomalies_at(&series, 1.0).is_err());
        assert!(detector.anomalies_at(&series, 0.0).is_err());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = DetectorConfig::default().with_trend(ComponentConfig::smooth(0.0, 2.0));
        assert!(matches!(
            Detector::new(config),
            Err(OddityError::InvalidHyperparameter(_))
        ));
        assert!(Detector::from_json(r#"{"trend": {}}"#).is_err());
    }

    #[test]
    fn detector_from_json_uses_configured_kernels() {
        let mut detector = Detector::from_json(
            r#"{
                "trend": {"kernel": "smooth", "l": 8.0, "sigma_y": 1.0},
                "seasonal": {"kernel": "locally_periodic", "l": 20.0, "sigma_y": 0.2, "period": 6}
            }"#,
        )
        .unwrap();
        let series = TimeSeries::new(seasonal_values(36, 6.0, 0.0)).unwrap();
        detector.fit(&series).unwrap();
        let kernel = detector.seasonal_kernel().unwrap();
        assert_eq!(kernel.name(), "locally_periodic");
        assert_eq!(kernel.period(), Some(6.0));
    }
}
