//! Seasonal decomposition.
//!
//! Classical additive decomposition into trend, seasonal and residual
//! components, with the period either supplied or inferred.

mod decompose;

pub use decompose::{decompose, Decomposition};
