//! Covariance kernels.
//!
//! Every kernel is a closed variant of [`Kernel`] carrying its own validated
//! parameter record. Parameters are checked once at construction, so
//! evaluating a kernel cannot fail.

use nalgebra::DMatrix;
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::error::{OddityError, Result};

/// Check that a hyperparameter is finite and strictly positive.
pub(crate) fn positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(OddityError::InvalidHyperparameter(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

/// Output scales whose square overflows are rejected along with non-positive ones.
fn output_scale(sigma_f: f64) -> Result<f64> {
    let sigma_f = positive("sigma_f", sigma_f)?;
    if !(sigma_f * sigma_f).is_finite() {
        return Err(OddityError::InvalidHyperparameter(format!(
            "sigma_f^2 overflows for sigma_f = {sigma_f}"
        )));
    }
    Ok(sigma_f)
}

/// Squared-exponential kernel `sigma_f^2 * exp(-(x - x')^2 / (2 l^2))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothKernel {
    length_scale: f64,
    sigma_f: f64,
}

impl SmoothKernel {
    pub fn new(length_scale: f64, sigma_f: f64) -> Result<Self> {
        Ok(Self {
            length_scale: positive("l", length_scale)?,
            sigma_f: output_scale(sigma_f)?,
        })
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn sigma_f(&self) -> f64 {
        self.sigma_f
    }

    #[inline]
    pub fn covariance(&self, x: f64, x_prime: f64) -> f64 {
        let d = x - x_prime;
        self.sigma_f.powi(2) * (-(d * d) / (2.0 * self.length_scale.powi(2))).exp()
    }
}

/// Exp-sine-squared kernel `sigma_f^2 * exp(-2 sin^2(pi |x - x'| / p) / l^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicKernel {
    length_scale: f64,
    sigma_f: f64,
    period: f64,
}

impl PeriodicKernel {
    pub fn new(length_scale: f64, sigma_f: f64, period: f64) -> Result<Self> {
        Ok(Self {
            length_scale: positive("l", length_scale)?,
            sigma_f: output_scale(sigma_f)?,
            period: positive("period", period)?,
        })
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn sigma_f(&self) -> f64 {
        self.sigma_f
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    #[inline]
    pub fn covariance(&self, x: f64, x_prime: f64) -> f64 {
        let s = (PI * (x - x_prime).abs() / self.period).sin();
        self.sigma_f.powi(2) * (-2.0 * s * s / self.length_scale.powi(2)).exp()
    }
}

/// Periodic kernel damped by a squared-exponential envelope with the same `l`.
///
/// Lets the seasonal shape drift slowly over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocallyPeriodicKernel {
    periodic: PeriodicKernel,
}

impl LocallyPeriodicKernel {
    pub fn new(length_scale: f64, sigma_f: f64, period: f64) -> Result<Self> {
        Ok(Self {
            periodic: PeriodicKernel::new(length_scale, sigma_f, period)?,
        })
    }

    pub fn length_scale(&self) -> f64 {
        self.periodic.length_scale
    }

    pub fn sigma_f(&self) -> f64 {
        self.periodic.sigma_f
    }

    pub fn period(&self) -> f64 {
        self.periodic.period
    }

    #[inline]
    pub fn covariance(&self, x: f64, x_prime: f64) -> f64 {
        let d = x - x_prime;
        let envelope = (-(d * d) / (2.0 * self.periodic.length_scale.powi(2))).exp();
        self.periodic.covariance(x, x_prime) * envelope
    }
}

/// Covariance function used by the Gaussian process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// Distance-decaying kernel for slowly varying trends.
    Smooth(SmoothKernel),
    /// Repeating kernel for seasonal structure.
    Periodic(PeriodicKernel),
    /// Seasonal structure whose shape may drift.
    LocallyPeriodic(LocallyPeriodicKernel),
}

impl Kernel {
    /// Smooth kernel with unit output scale.
    pub fn smooth(length_scale: f64) -> Result<Self> {
        SmoothKernel::new(length_scale, 1.0).map(Kernel::Smooth)
    }

    /// Periodic kernel with unit output scale.
    pub fn periodic(length_scale: f64, period: f64) -> Result<Self> {
        PeriodicKernel::new(length_scale, 1.0, period).map(Kernel::Periodic)
    }

    /// Locally periodic kernel with unit output scale.
    pub fn locally_periodic(length_scale: f64, period: f64) -> Result<Self> {
        LocallyPeriodicKernel::new(length_scale, 1.0, period).map(Kernel::LocallyPeriodic)
    }

    /// Prior covariance between positions `x` and `x_prime`.
    #[inline]
    pub fn covariance(&self, x: f64, x_prime: f64) -> f64 {
        match self {
            Kernel::Smooth(k) => k.covariance(x, x_prime),
            Kernel::Periodic(k) => k.covariance(x, x_prime),
            Kernel::LocallyPeriodic(k) => k.covariance(x, x_prime),
        }
    }

    /// Prior variance at any single position, `sigma_f^2`.
    pub fn prior_variance(&self) -> f64 {
        let sigma_f = match self {
            Kernel::Smooth(k) => k.sigma_f(),
            Kernel::Periodic(k) => k.sigma_f(),
            Kernel::LocallyPeriodic(k) => k.sigma_f(),
        };
        sigma_f * sigma_f
    }

    /// Period of the seasonal kernels, `None` for the smooth kernel.
    pub fn period(&self) -> Option<f64> {
        match self {
            Kernel::Smooth(_) => None,
            Kernel::Periodic(k) => Some(k.period()),
            Kernel::LocallyPeriodic(k) => Some(k.period()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Smooth(_) => "smooth",
            Kernel::Periodic(_) => "periodic",
            Kernel::LocallyPeriodic(_) => "locally_periodic",
        }
    }

    /// Cross-covariance matrix with `K[(i, j)] = k(rows[i], cols[j])`.
    ///
    /// Columns are filled in parallel; each worker owns one column of the
    /// column-major buffer.
    pub fn gram(&self, rows: &[f64], cols: &[f64]) -> DMatrix<f64> {
        let n_rows = rows.len();
        let n_cols = cols.len();
        if n_rows == 0 || n_cols == 0 {
            return DMatrix::zeros(n_rows, n_cols);
        }

        let mut data = vec![0.0; n_rows * n_cols];
        data.par_chunks_mut(n_rows)
            .zip(cols.par_iter())
            .for_each(|(column, &y)| {
                for (entry, &x) in column.iter_mut().zip(rows) {
                    *entry = self.covariance(x, y);
                }
            });

        DMatrix::from_vec(n_rows, n_cols, data)
    }
}
