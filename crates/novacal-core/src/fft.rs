//! FFT wrapper and the Blackman-Harris window used for harmonic extraction.

use rustfft::{Fft, FftPlanner, num_complex::Complex64};
use std::f64::consts::PI;
use std::sync::Arc;

/// 4-term Blackman-Harris coefficients.
const BH_A0: f64 = 0.35875;
const BH_A1: f64 = 0.48829;
const BH_A2: f64 = 0.14128;
const BH_A3: f64 = 0.01168;

/// Symmetric 4-term Blackman-Harris window of length `size`.
///
/// Uses `size - 1` as the period so both end points sit at the window minimum.
/// A length-1 window is `[1.0]`.
pub fn blackman_harris(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|n| {
            let x = 2.0 * PI * n as f64 / denom;
            BH_A0 - BH_A1 * x.cos() + BH_A2 * (2.0 * x).cos() - BH_A3 * (3.0 * x).cos()
        })
        .collect()
}

/// Multiply `signal` by `window` sample-by-sample.
pub fn apply_window(signal: &[f64], window: &[f64]) -> Vec<f64> {
    signal.iter().zip(window).map(|(&s, &w)| s * w).collect()
}

/// One-sided frequency axis `k / (N * T)` for `k` in `0..=N/2`.
pub fn frequency_axis(size: usize, sample_rate: f64) -> Vec<f64> {
    let resolution = sample_rate / size as f64;
    (0..=size / 2).map(|k| k as f64 * resolution).collect()
}

/// Magnitude of each complex bin.
pub fn magnitude(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|c| c.norm()).collect()
}

/// Forward FFT of real input with a cached plan.
pub struct RealFft {
    fft: Arc<dyn Fft<f64>>,
    size: usize,
}

impl RealFft {
    /// Plan a forward transform of `size` points.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    /// Transform size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of real input.
    ///
    /// Input is zero-padded or truncated to the plan size. Returns the
    /// non-negative half of the spectrum (`size/2 + 1` bins, DC to Nyquist),
    /// unnormalized.
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex64::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer.truncate(self.size / 2 + 1);
        buffer
    }
}
