//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile function of the standard normal distribution.
///
/// # Arguments
/// * `p` - Probability value (0.0 to 1.0)
///
/// # Returns
/// The z-score corresponding to the given probability.
///
/// # Example
/// ```
/// use oddity::utils::quantile_normal;
///
/// // 95% two-sided confidence -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Calculate the mean of a slice.
///
/// Accumulated as a running mean so finite inputs near `f64::MAX` do not
/// overflow an intermediate sum.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    running_mean(values.iter().copied())
}

fn running_mean(values: impl Iterator<Item = f64>) -> f64 {
    values
        .enumerate()
        .fold(0.0, |m, (k, x)| m + (x - m) / (k + 1) as f64)
}

/// Population variance (divisor `n`).
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    running_mean(values.iter().map(|x| (x - m).powi(2)))
}

/// Population standard deviation (divisor `n`).
pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Remove the least-squares line `a + b * i` from a series.
///
/// Series shorter than two points are returned centred on their mean.
pub fn detrend_linear(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        let m = if n == 0 { 0.0 } else { values[0] };
        return values.iter().map(|x| x - m).collect();
    }

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = y_mean - slope * x_mean;

    values
        .iter()
        .enumerate()
        .map(|(i, &y)| y - (intercept + slope * i as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 1e-6);
        assert_relative_eq!(quantile_normal(0.975), 1.959964, epsilon = 1e-4);
        assert_relative_eq!(quantile_normal(0.025), -1.959964, epsilon = 1e-4);
        assert_relative_eq!(quantile_normal(0.995), 2.575829, epsilon = 1e-4);
    }

    #[test]
    fn quantile_normal_boundary_values() {
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(mean(&[10.0]), 10.0, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn mean_and_variance_of_huge_values_stay_finite() {
        assert_eq!(mean(&[1e308, 1e308]), 1e308);
        assert_relative_eq!(mean(&[1e308, 5e307, 1e308]), 8.333333333333333e307, max_relative = 1e-12);
        assert_eq!(population_variance(&[1e308, 1e308, 1e308]), 0.0);
    }

    #[test]
    fn population_variance_uses_n_divisor() {
        // Population variance of [1, 2, 3, 4, 5] = 2.0
        assert_relative_eq!(
            population_variance(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            2.0,
            epsilon = 1e-10
        );
        assert_relative_eq!(population_variance(&[7.0]), 0.0, epsilon = 1e-12);
        assert!(population_variance(&[]).is_nan());
        assert_relative_eq!(
            population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]),
            2.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn median_calculates_correctly() {
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-10);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0, 4.0]), 3.0, epsilon = 1e-10);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn detrend_linear_removes_exact_line() {
        let values: Vec<f64> = (0..20).map(|i| 3.0 + 0.5 * i as f64).collect();
        for r in detrend_linear(&values) {
            assert_relative_eq!(r, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn detrend_linear_keeps_oscillation() {
        let values: Vec<f64> = (0..40)
            .map(|i| 0.2 * i as f64 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let detrended = detrend_linear(&values);
        assert!(detrended[0] > 0.5);
        assert!(detrended[1] < -0.5);
    }

    #[test]
    fn detrend_linear_short_inputs() {
        assert!(detrend_linear(&[]).is_empty());
        assert_eq!(detrend_linear(&[4.0]), vec![0.0]);
    }
}
