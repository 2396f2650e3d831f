//! Detector hyperparameters.
//!
//! The configuration mirrors the JSON shape accepted from front-ends:
//!
//! ```json
//! {
//!   "trend":    {"kernel": "smooth",   "l": 10.0, "sigma_y": 2.0},
//!   "seasonal": {"kernel": "periodic", "sigma_y": 0.25}
//! }
//! ```
//!
//! Kernel names form a closed set; unknown names and unknown keys are
//! rejected when the configuration is parsed.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::detection::infer_period;
use crate::error::{OddityError, Result};
use crate::gp::{Kernel, LocallyPeriodicKernel, PeriodicKernel, SmoothKernel};

/// Length scale used when a component does not set `l`.
pub const DEFAULT_LENGTH_SCALE: f64 = 1.0;

/// Output scale used when a component does not set `sigma_f`.
pub const DEFAULT_SIGMA_F: f64 = 1.0;

/// Period used by the seasonal kernels when none is configured and none can
/// be inferred from the data.
pub const DEFAULT_PERIOD: f64 = 12.0;

/// Kernel family of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    #[serde(alias = "rbf")]
    Smooth,
    Periodic,
    #[serde(alias = "locally periodic")]
    LocallyPeriodic,
}

/// Hyperparameters of one Gaussian process component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    pub kernel: KernelKind,
    /// Kernel length scale `l`.
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub length_scale: Option<f64>,
    /// Kernel output scale.
    #[serde(alias = "sigma", default, skip_serializing_if = "Option::is_none")]
    pub sigma_f: Option<f64>,
    /// Observation noise standard deviation.
    pub sigma_y: f64,
    /// Period of the seasonal kernels; inferred from the data when absent,
    /// falling back to [`DEFAULT_PERIOD`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
}

impl ComponentConfig {
    fn with_kind(kernel: KernelKind, sigma_y: f64) -> Self {
        Self {
            kernel,
            length_scale: None,
            sigma_f: None,
            sigma_y,
            period: None,
        }
    }

    /// Smooth kernel component.
    pub fn smooth(length_scale: f64, sigma_y: f64) -> Self {
        Self::with_kind(KernelKind::Smooth, sigma_y).with_length_scale(length_scale)
    }

    /// Periodic kernel component; the period is inferred unless set.
    pub fn periodic(sigma_y: f64) -> Self {
        Self::with_kind(KernelKind::Periodic, sigma_y)
    }

    /// Locally periodic kernel component; the period is inferred unless set.
    pub fn locally_periodic(sigma_y: f64) -> Self {
        Self::with_kind(KernelKind::LocallyPeriodic, sigma_y)
    }

    pub fn with_length_scale(mut self, l: f64) -> Self {
        self.length_scale = Some(l);
        self
    }

    pub fn with_sigma_f(mut self, sigma_f: f64) -> Self {
        self.sigma_f = Some(sigma_f);
        self
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = Some(period);
        self
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale.unwrap_or(DEFAULT_LENGTH_SCALE)
    }

    pub fn sigma_f(&self) -> f64 {
        self.sigma_f.unwrap_or(DEFAULT_SIGMA_F)
    }

    /// Check every supplied value without needing data.
    pub fn validate(&self) -> Result<()> {
        if !self.sigma_y.is_finite() || self.sigma_y < 0.0 {
            return Err(OddityError::InvalidHyperparameter(format!(
                "sigma_y must be non-negative and finite, got {}",
                self.sigma_y
            )));
        }
        // A placeholder period lets the kernel constructors check l and sigma_f.
        self.build(self.period.unwrap_or(1.0)).map(|_| ())
    }

    /// Build the kernel, inferring a missing period from `values`.
    ///
    /// When no period can be inferred, [`DEFAULT_PERIOD`] is used.
    pub fn kernel_for(&self, values: &[f64]) -> Result<Kernel> {
        let period = match (self.kernel, self.period) {
            (KernelKind::Smooth, _) => 1.0,
            (_, Some(p)) => p,
            (_, None) => match infer_period(values) {
                Ok(p) => p as f64,
                Err(e) => {
                    warn!(
                        error = %e,
                        period = DEFAULT_PERIOD,
                        "period inference failed, using default period"
                    );
                    DEFAULT_PERIOD
                }
            },
        };
        self.build(period)
    }

    fn build(&self, period: f64) -> Result<Kernel> {
        let l = self.length_scale();
        let sigma_f = self.sigma_f();
        match self.kernel {
            KernelKind::Smooth => SmoothKernel::new(l, sigma_f).map(Kernel::Smooth),
            KernelKind::Periodic => PeriodicKernel::new(l, sigma_f, period).map(Kernel::Periodic),
            KernelKind::LocallyPeriodic => {
                LocallyPeriodicKernel::new(l, sigma_f, period).map(Kernel::LocallyPeriodic)
            }
        }
    }
}

/// Hyperparameters of both detector components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub trend: ComponentConfig,
    pub seasonal: ComponentConfig,
}

impl Default for DetectorConfig {
    /// Trend: smooth, `l = 10`, `sigma_y = 2`. Seasonal: periodic,
    /// `sigma_y = 0.25`, default `l`, inferred period.
    fn default() -> Self {
        Self {
            trend: ComponentConfig::smooth(10.0, 2.0),
            seasonal: ComponentConfig::periodic(0.25),
        }
    }
}

impl DetectorConfig {
    pub fn with_trend(mut self, trend: ComponentConfig) -> Self {
        self.trend = trend;
        self
    }

    pub fn with_seasonal(mut self, seasonal: ComponentConfig) -> Self {
        self.seasonal = seasonal;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OddityError::InvalidHyperparameter(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate an already deserialized JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| OddityError::InvalidHyperparameter(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.trend.validate()?;
        self.seasonal.validate()
    }
}
