//! Cycle stacking: average every detected period of a capture into one
//! fixed-length representative cycle.
//!
//! # Algorithm
//!
//! 1. Zero crossings are taken relative to the capture mean, at every index
//!    `i` where `(x[i] - mean) * (x[i+1] - mean) < 0`.
//! 2. Starting at every second crossing (same-polarity transitions), one
//!    cycle of `round(sample_rate / fundamental)` samples is copied out.
//!    Cycles that would run past the end of the capture are skipped.
//! 3. The cycles are averaged element-wise and the mean cycle is linearly
//!    resampled onto exactly `n_samples` points.
//!
//! Averaging suppresses uncorrelated noise by roughly `sqrt(cycles)`.

use crate::error::{Error, Result};

/// Default length of a stacked waveform.
pub const DEFAULT_STACK_SAMPLES: usize = 2048;

/// Produces fixed-length stacked waveforms from raw captures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformStacker {
    n_samples: usize,
}

impl Default for WaveformStacker {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_STACK_SAMPLES,
        }
    }
}

impl WaveformStacker {
    /// Create a stacker producing `n_samples` points per waveform.
    pub fn new(n_samples: usize) -> Result<Self> {
        if n_samples == 0 {
            return Err(Error::invalid_parameter("n_samples", "must be at least 1"));
        }
        Ok(Self { n_samples })
    }

    /// Output length of every stacked waveform.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Stack the capture and resample the mean cycle to [`Self::n_samples`] points.
    pub fn stack(&self, signal: &[f64], sample_rate: f64, fundamental: f64) -> Result<Vec<f64>> {
        let samples_per_cycle = samples_per_cycle(sample_rate, fundamental)?;
        let cycle = representative_cycle(signal, samples_per_cycle)?;
        tracing::debug!(
            samples_per_cycle,
            n_samples = self.n_samples,
            "stacked representative cycle"
        );
        Ok(resample_linear(&cycle, self.n_samples))
    }
}

/// Samples in one fundamental period, `round(sample_rate / fundamental)`.
pub fn samples_per_cycle(sample_rate: f64, fundamental: f64) -> Result<usize> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(Error::invalid_parameter(
            "sample_rate",
            format!("must be positive and finite, got {sample_rate}"),
        ));
    }
    if !(fundamental.is_finite() && fundamental > 0.0) {
        return Err(Error::invalid_parameter(
            "fundamental",
            format!("must be positive and finite, got {fundamental}"),
        ));
    }
    let samples = (sample_rate / fundamental).round();
    if samples < 1.0 {
        return Err(Error::invalid_parameter(
            "fundamental",
            format!("{fundamental} Hz is above the sample rate {sample_rate} Hz"),
        ));
    }
    Ok(samples as usize)
}

/// Indices `i` where the signal crosses its mean between `i` and `i + 1`.
pub fn zero_crossings(signal: &[f64]) -> Vec<usize> {
    if signal.len() < 2 {
        return Vec::new();
    }
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    signal
        .windows(2)
        .enumerate()
        .filter(|(_, w)| (w[0] - mean) * (w[1] - mean) < 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Element-wise mean of every cycle that starts on an even-numbered crossing.
pub fn representative_cycle(signal: &[f64], samples_per_cycle: usize) -> Result<Vec<f64>> {
    let mut sum = vec![0.0; samples_per_cycle];
    let mut count = 0usize;

    for &start in zero_crossings(signal).iter().step_by(2) {
        let Some(cycle) = signal.get(start..start + samples_per_cycle) else {
            continue;
        };
        for (acc, &x) in sum.iter_mut().zip(cycle) {
            *acc += x;
        }
        count += 1;
    }

    if count == 0 {
        return Err(Error::NoPeriodicSignal);
    }

    let scale = 1.0 / count as f64;
    for acc in &mut sum {
        *acc *= scale;
    }
    Ok(sum)
}

/// Linearly resample `cycle` onto exactly `n_samples` points.
///
/// Output point `i` reads the input at `i / (n_samples - 1) * (len - 1)`, so the
/// first and last points map onto the first and last input samples.
pub fn resample_linear(cycle: &[f64], n_samples: usize) -> Vec<f64> {
    if cycle.is_empty() {
        return vec![0.0; n_samples];
    }
    let last = cycle.len() - 1;
    let span = n_samples.saturating_sub(1).max(1) as f64;

    (0..n_samples)
        .map(|i| {
            let idx = i as f64 / span * last as f64;
            let low = idx.floor() as usize;
            let high = (idx.ceil() as usize).min(last);
            let frac = idx - low as f64;
            cycle[low] * (1.0 - frac) + cycle[high] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(period: usize, cycles: usize, high: f64, low: f64) -> Vec<f64> {
        (0..period * cycles)
            .map(|i| if i % period < period / 2 { high } else { low })
            .collect()
    }

    #[test]
    fn zero_crossings_of_square_wave() {
        let signal = square(8, 3, 1.0, -1.0);
        // Transitions at 3->4, 7->8, 11->12, ...
        assert_eq!(zero_crossings(&signal), vec![3, 7, 11, 15, 19]);
    }

    #[test]
    fn zero_crossings_use_the_mean_not_zero() {
        let signal = square(8, 2, 5.0, 3.0);
        assert_eq!(zero_crossings(&signal), vec![3, 7, 11]);
    }

    #[test]
    fn flat_signal_is_not_periodic() {
        let err = representative_cycle(&[1.0; 64], 8).unwrap_err();
        assert!(matches!(err, Error::NoPeriodicSignal));
    }

    #[test]
    fn cycle_past_end_is_skipped() {
        // Only one crossing, and the cycle from it would overrun.
        let signal = [1.0, 1.0, -1.0, -1.0];
        let err = representative_cycle(&signal, 8).unwrap_err();
        assert!(matches!(err, Error::NoPeriodicSignal));
    }

    #[test]
    fn cycle_ending_exactly_at_signal_end_is_kept() {
        // Crossing at 1; cycle covers indices 1..5 which is the full tail.
        let signal = [1.0, 1.0, -1.0, -1.0, 1.0];
        let cycle = representative_cycle(&signal, 4).unwrap();
        assert_eq!(cycle, vec![1.0, -1.0, -1.0, 1.0]);
    }

    #[test]
    fn final_crossing_starts_a_cycle() {
        // Crossings at 3, 7, 11, 15, 19; cycles start at 3, 11 and 19.
        let mut signal = square(8, 3, 1.0, -1.0);
        signal[20] = -3.0;
        let cycle = representative_cycle(&signal, 4).unwrap();
        assert!((cycle[1] + 5.0 / 3.0).abs() < 1e-12, "{cycle:?}");
    }

    #[test]
    fn averaging_suppresses_alternating_offset() {
        let period = 16;
        let mut signal = square(period, 8, 1.0, -1.0);
        // Every other period gets +0.2 / the next -0.2: averages out.
        for (i, x) in signal.iter_mut().enumerate() {
            *x += if (i / period) % 2 == 0 { 0.2 } else { -0.2 };
        }
        let cycle = representative_cycle(&signal, period).unwrap();
        let mean = cycle.iter().sum::<f64>() / cycle.len() as f64;
        assert!(mean.abs() < 0.1, "mean {mean}");
    }

    #[test]
    fn resample_hits_end_points() {
        let out = resample_linear(&[0.0, 10.0], 11);
        assert_eq!(out.len(), 11);
        for (i, v) in out.iter().enumerate() {
            assert!((v - i as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn resample_single_point_and_single_input() {
        assert_eq!(resample_linear(&[3.0, 4.0, 5.0], 1), vec![3.0]);
        assert_eq!(resample_linear(&[7.0], 4), vec![7.0; 4]);
    }

    #[test]
    fn samples_per_cycle_rounds() {
        assert_eq!(samples_per_cycle(51200.0, 3.0).unwrap(), 17067);
        assert_eq!(samples_per_cycle(1000.0, 300.0).unwrap(), 3);
    }

    #[test]
    fn samples_per_cycle_rejects_bad_rates() {
        assert!(samples_per_cycle(0.0, 1.0).is_err());
        assert!(samples_per_cycle(1000.0, f64::NAN).is_err());
        assert!(samples_per_cycle(100.0, 1000.0).is_err());
    }

    #[test]
    fn stack_produces_configured_length() {
        let stacker = WaveformStacker::new(2048).unwrap();
        let signal = square(100, 20, 1.0, -1.0);
        let stacked = stacker.stack(&signal, 1000.0, 10.0).unwrap();
        assert_eq!(stacked.len(), 2048);
        let max = stacked.iter().copied().fold(f64::MIN, f64::max);
        let min = stacked.iter().copied().fold(f64::MAX, f64::min);
        assert!((max - 1.0).abs() < 1e-12 && (min + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_length_stacker_rejected() {
        assert!(WaveformStacker::new(0).is_err());
        assert_eq!(WaveformStacker::default().n_samples(), DEFAULT_STACK_SAMPLES);
    }
}
