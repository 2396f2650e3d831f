//! Error types for the oddity library.

use thiserror::Error;

/// Result type alias for oddity operations.
pub type Result<T> = std::result::Result<T, OddityError>;

/// Errors that can occur while building series, decomposing them or fitting models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OddityError {
    /// Input is not a flat sequence of numbers.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A value is NaN or infinite.
    #[error("invalid value at position {index}: {value}")]
    InvalidValue { index: usize, value: f64 },

    /// A kernel or fit parameter is out of its domain.
    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    /// A statistic was requested on a zero-length series.
    #[error("empty series")]
    EmptySeries,

    /// Single-index access outside `[0, len)`.
    #[error("index out of range: {index} (len: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Two sequences that must line up have different lengths.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// No usable seasonal period could be established.
    #[error("period not found: {0}")]
    PeriodNotFound(String),

    /// Cholesky factorization failed even after jitter was added.
    #[error("kernel matrix is singular (n = {size}, last jitter = {jitter:e})")]
    SingularKernelMatrix { size: usize, jitter: f64 },

    /// Posterior requested before `fit`.
    #[error("detector must be fitted before its posterior can be read")]
    NotFitted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = OddityError::EmptySeries;
        assert_eq!(err.to_string(), "empty series");

        let err = OddityError::IndexOutOfRange { index: 8, len: 3 };
        assert_eq!(err.to_string(), "index out of range: 8 (len: 3)");

        let err = OddityError::InvalidHyperparameter("l must be positive".to_string());
        assert_eq!(err.to_string(), "invalid hyperparameter: l must be positive");

        let err = OddityError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");

        let err = OddityError::NotFitted;
        assert_eq!(
            err.to_string(),
            "detector must be fitted before its posterior can be read"
        );
    }

    #[test]
    fn singular_matrix_reports_size_and_jitter() {
        let err = OddityError::SingularKernelMatrix {
            size: 4,
            jitter: 1e-4,
        };
        let msg = err.to_string();
        assert!(msg.contains("n = 4"));
        assert!(msg.contains("1e-4"));
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = OddityError::PeriodNotFound("too short".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
