//! Gaussian process regression.
//!
//! - [`Kernel`]: closed set of covariance functions with validated parameters
//! - [`GaussianProcess`]: conditions a prior on a series and returns a [`Posterior`]

mod kernel;
mod regression;

pub use kernel::{Kernel, LocallyPeriodicKernel, PeriodicKernel, SmoothKernel};
pub use regression::{GaussianProcess, Posterior};
