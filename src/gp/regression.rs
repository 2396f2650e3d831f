//! Gaussian process regression over implicit time indices.
//!
//! Training inputs are the positions `0..n` of the target series. The
//! posterior is computed from a Cholesky factor of `K + sigma_y^2 I`; the
//! inverse is never formed explicitly.
//!
//! Cost is O(n^3) for the factorization and O(n^2) memory for the Gram
//! matrix, which keeps practical inputs to a few hundred up to low thousands
//! of points.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use tracing::{debug, warn};

use super::kernel::Kernel;
use crate::core::TimeSeries;
use crate::error::{OddityError, Result};

/// Diagonal jitter tried, in order, when `K + sigma_y^2 I` is not numerically
/// positive definite. Relative to the mean diagonal entry.
const JITTER_SCHEDULE: [f64; 4] = [1e-10, 1e-8, 1e-6, 1e-4];

/// A factor whose smallest squared pivot falls below this fraction of the
/// mean diagonal is treated as failed; tiny positive pivots make the solve
/// meaningless even though the factorization itself succeeds.
const MIN_RELATIVE_PIVOT: f64 = 1e-12;

/// Added to `K(X*, X*)` for out-of-sample queries.
const QUERY_JITTER: f64 = 1e-8;

/// Posterior mean and covariance at a set of query positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    mean: Vec<f64>,
    covariance: DMatrix<f64>,
}

impl Posterior {
    /// Posterior mean, one entry per query position.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Posterior covariance. Symmetric, with non-negative diagonal.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Diagonal of the covariance.
    pub fn variance(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().copied().collect()
    }

    pub fn std_dev(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.sqrt()).collect()
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn into_parts(self) -> (Vec<f64>, DMatrix<f64>) {
        (self.mean, self.covariance)
    }
}

/// A Gaussian process prior with Gaussian observation noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianProcess {
    kernel: Kernel,
    sigma_y: f64,
}

impl GaussianProcess {
    /// Create a process with the given kernel and observation noise `sigma_y >= 0`.
    pub fn new(kernel: Kernel, sigma_y: f64) -> Result<Self> {
        if !sigma_y.is_finite() || sigma_y < 0.0 {
            return Err(OddityError::InvalidHyperparameter(format!(
                "sigma_y must be non-negative and finite, got {sigma_y}"
            )));
        }
        Ok(Self { kernel, sigma_y })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn sigma_y(&self) -> f64 {
        self.sigma_y
    }

    /// Condition on `targets` and evaluate the posterior at the training positions.
    ///
    /// Returns `mu = K alpha` with `alpha = (K + sigma_y^2 I)^-1 y` and
    /// `cov = K - K (K + sigma_y^2 I)^-1 K`.
    pub fn fit(&self, targets: &TimeSeries) -> Result<Posterior> {
        let n = targets.len();
        if n == 0 {
            return Err(OddityError::EmptySeries);
        }
        debug!(n, kernel = self.kernel.name(), sigma_y = self.sigma_y, "fitting gaussian process");

        let x = positions(n);
        let k = self.kernel.gram(&x, &x);
        self.condition(&k, &k, k.clone(), targets)
    }

    /// Condition on `targets` and evaluate the posterior at arbitrary positions.
    pub fn fit_predict(&self, targets: &TimeSeries, query: &[f64]) -> Result<Posterior> {
        let n = targets.len();
        if n == 0 {
            return Err(OddityError::EmptySeries);
        }
        if let Some(index) = query.iter().position(|q| !q.is_finite()) {
            return Err(OddityError::InvalidValue {
                index,
                value: query[index],
            });
        }
        debug!(
            n,
            m = query.len(),
            kernel = self.kernel.name(),
            sigma_y = self.sigma_y,
            "fitting gaussian process for out-of-sample query"
        );

        let x = positions(n);
        let k = self.kernel.gram(&x, &x);
        let k_s = self.kernel.gram(&x, query);
        let mut k_ss = self.kernel.gram(query, query);
        for i in 0..query.len() {
            k_ss[(i, i)] += QUERY_JITTER;
        }
        self.condition(&k, &k_s, k_ss, targets)
    }

    /// Shared posterior computation.
    ///
    /// `k` is the training Gram matrix, `k_s` the train/query cross-covariance
    /// and `k_ss` the query Gram matrix.
    fn condition(
        &self,
        k: &DMatrix<f64>,
        k_s: &DMatrix<f64>,
        k_ss: DMatrix<f64>,
        targets: &TimeSeries,
    ) -> Result<Posterior> {
        let n = k.nrows();
        let noise = self.sigma_y * self.sigma_y;
        let mut k_noisy = k.clone();
        for i in 0..n {
            k_noisy[(i, i)] += noise;
        }

        let chol = factorize(&k_noisy)?;
        let y = DVector::from_column_slice(targets.values());
        let alpha = chol.solve(&y);
        let mean = (k_s.transpose() * alpha).iter().copied().collect();

        // cov = K** - V^T V with V = L^-1 K*
        let v = chol
            .l()
            .solve_lower_triangular(k_s)
            .ok_or(OddityError::SingularKernelMatrix { size: n, jitter: 0.0 })?;
        let raw = k_ss - v.transpose() * v;

        Ok(Posterior {
            mean,
            covariance: symmetrize(raw),
        })
    }
}

fn positions(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Cholesky factor of `matrix`, retrying with escalating diagonal jitter.
pub(crate) fn factorize(matrix: &DMatrix<f64>) -> Result<Cholesky<f64, Dyn>> {
    let n = matrix.nrows();
    let scale = if n == 0 {
        1.0
    } else {
        let mean_diag = matrix.trace() / n as f64;
        if mean_diag.is_finite() && mean_diag > 0.0 {
            mean_diag
        } else {
            1.0
        }
    };

    if let Some(chol) = well_conditioned_cholesky(matrix.clone(), scale) {
        return Ok(chol);
    }

    let mut jitter = 0.0;
    for relative in JITTER_SCHEDULE {
        jitter = relative * scale;
        warn!(n, jitter, "kernel matrix not positive definite, retrying with jitter");

        let mut jittered = matrix.clone();
        for i in 0..n {
            jittered[(i, i)] += jitter;
        }
        if let Some(chol) = well_conditioned_cholesky(jittered, scale) {
            return Ok(chol);
        }
    }

    Err(OddityError::SingularKernelMatrix { size: n, jitter })
}

fn well_conditioned_cholesky(matrix: DMatrix<f64>, scale: f64) -> Option<Cholesky<f64, Dyn>> {
    let chol = matrix.cholesky()?;
    let min_pivot = chol
        .l_dirty()
        .diagonal()
        .iter()
        .fold(f64::INFINITY, |acc, &d| acc.min(d));
    (min_pivot * min_pivot >= MIN_RELATIVE_PIVOT * scale).then_some(chol)
}

/// Average with the transpose and clamp negative round-off on the diagonal.
fn symmetrize(matrix: DMatrix<f64>) -> DMatrix<f64> {
    let mut sym = (&matrix + matrix.transpose()) * 0.5;
    for i in 0..sym.nrows().min(sym.ncols()) {
        if sym[(i, i)] < 0.0 {
            sym[(i, i)] = 0.0;
        }
    }
    sym
}
