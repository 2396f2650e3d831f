//! Spectral helpers for period detection.

use rustfft::{num_complex::Complex64, FftPlanner};

/// Forward FFT of a real signal, positive frequencies only (`0..=n/2`).
pub fn fft_real(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    buffer.truncate(n / 2 + 1);
    buffer
}

/// Magnitude spectrum `|X[k]|` for `k = 0..=n/2`.
pub fn magnitude_spectrum(signal: &[f64]) -> Vec<f64> {
    fft_real(signal).iter().map(|c| c.norm()).collect()
}

/// Periodogram as `(period, power)` pairs, largest period first.
///
/// The DC bin is skipped and bins whose period would be below 2 samples are
/// dropped. Power is `|X[k]|^2 / n`.
pub fn periodogram(signal: &[f64]) -> Vec<(usize, f64)> {
    let n = signal.len();
    if n < 4 {
        return Vec::new();
    }

    let nf = n as f64;
    fft_real(signal)
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| (n / k, c.norm_sqr() / nf))
        .take_while(|&(period, _)| period >= 2)
        .collect()
}

/// Periodogram bins in `[min_period, max_period]` whose power exceeds
/// `threshold` times the median power, strongest first.
pub fn periodogram_peaks(
    signal: &[f64],
    threshold: f64,
    min_period: usize,
    max_period: usize,
) -> Vec<(usize, f64)> {
    let in_range: Vec<(usize, f64)> = periodogram(signal)
        .into_iter()
        .filter(|&(p, _)| p >= min_period && p <= max_period)
        .collect();
    if in_range.is_empty() {
        return in_range;
    }

    let powers: Vec<f64> = in_range.iter().map(|&(_, p)| p).collect();
    let noise_floor = crate::utils::stats::median(&powers);

    let mut peaks: Vec<(usize, f64)> = in_range
        .into_iter()
        .filter(|&(_, power)| power > noise_floor * threshold)
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks
}
