//! Transfer-function extraction from a transmit/receive capture pair.
//!
//! Two stimulus modes share one output contract, a list of
//! [`TransferSample`]s:
//!
//! - **Square**: both captures are Blackman-Harris windowed and transformed;
//!   every local maximum of the transmit magnitude spectrum above
//!   `peak_threshold * max` is a harmonic, and the sample at that bin is
//!   `rx[k] / tx[k]`.
//! - **Sine**: the known stimulus frequency selects bin `k = round(f * N / fs)`
//!   and a single DFT term `(2/N) Σ x[i] e^{-j2πki/N}` is evaluated for each
//!   capture.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rustfft::num_complex::Complex64;

use crate::error::{Error, Result};
use crate::fft::{RealFft, apply_window, blackman_harris, frequency_axis, magnitude};
use crate::phase::wrap_degrees;

/// Default sample rate of the acquisition hardware (Hz).
pub const DEFAULT_SAMPLE_RATE: f64 = 51200.0;

/// Default harmonic detection threshold, relative to the strongest tx bin.
pub const DEFAULT_PEAK_THRESHOLD: f64 = 0.04;

/// Stimulus waveform driving the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Waveform {
    /// Single-tone sine stimulus.
    Sine,
    /// Square stimulus exciting the odd harmonics.
    Square,
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waveform::Sine => f.write_str("sine"),
            Waveform::Square => f.write_str("square"),
        }
    }
}

impl FromStr for Waveform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sq" => Ok(Waveform::Square),
            other => Err(Error::invalid_parameter(
                "waveform",
                format!("unknown waveform '{other}' (expected Sine or Square)"),
            )),
        }
    }
}

/// One point of a transfer function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferSample {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Complex ratio rx / tx.
    pub ratio: Complex64,
}

impl TransferSample {
    /// Create a sample.
    pub fn new(frequency: f64, ratio: Complex64) -> Self {
        Self { frequency, ratio }
    }

    /// Gain in dB, `20 log10 |ratio|`.
    pub fn amplitude_db(&self) -> f64 {
        20.0 * self.ratio.norm().log10()
    }

    /// Wrapped phase in degrees, in `(-180, 180]`.
    pub fn phase_deg(&self) -> f64 {
        wrap_degrees(self.ratio.arg().to_degrees())
    }
}

/// Spectra behind a square-wave measurement, for inspection.
#[derive(Debug, Clone)]
pub struct HarmonicSpectra {
    /// One-sided frequency axis (Hz).
    pub frequencies: Vec<f64>,
    /// Windowed transmit spectrum.
    pub tx: Vec<Complex64>,
    /// Windowed receive spectrum.
    pub rx: Vec<Complex64>,
    /// Bins detected as harmonics.
    pub peaks: Vec<usize>,
}

impl HarmonicSpectra {
    /// Transfer samples at the detected harmonic bins.
    pub fn samples(&self) -> Vec<TransferSample> {
        self.peaks
            .iter()
            .map(|&k| TransferSample::new(self.frequencies[k], self.rx[k] / self.tx[k]))
            .collect()
    }
}

/// Computes transfer samples for one capture pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralCalibrator {
    sample_rate: f64,
    peak_threshold: f64,
}

impl Default for SpectralCalibrator {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            peak_threshold: DEFAULT_PEAK_THRESHOLD,
        }
    }
}

impl SpectralCalibrator {
    /// Create a calibrator for captures sampled at `sample_rate` Hz.
    pub fn new(sample_rate: f64) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::invalid_parameter(
                "sample_rate",
                format!("must be positive and finite, got {sample_rate}"),
            ));
        }
        Ok(Self {
            sample_rate,
            ..Self::default()
        })
    }

    /// Override the harmonic detection threshold (fraction of the tx maximum).
    pub fn with_peak_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(threshold.is_finite() && (0.0..1.0).contains(&threshold)) {
            return Err(Error::invalid_parameter(
                "peak_threshold",
                format!("must be in [0, 1), got {threshold}"),
            ));
        }
        self.peak_threshold = threshold;
        Ok(self)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Harmonic detection threshold.
    pub fn peak_threshold(&self) -> f64 {
        self.peak_threshold
    }

    /// Transfer samples for a capture pair driven by `waveform` at `frequency` Hz.
    ///
    /// The square-wave path ignores `frequency`; harmonics are found from the
    /// transmit spectrum.
    pub fn transfer(
        &self,
        waveform: Waveform,
        frequency: f64,
        tx: &[f64],
        rx: &[f64],
    ) -> Result<Vec<TransferSample>> {
        match waveform {
            Waveform::Square => Ok(self.harmonic_spectra(tx, rx)?.samples()),
            Waveform::Sine => self.single_tone(frequency, tx, rx).map(|s| vec![s]),
        }
    }

    /// Windowed spectra and detected harmonic bins of a square-wave capture.
    pub fn harmonic_spectra(&self, tx: &[f64], rx: &[f64]) -> Result<HarmonicSpectra> {
        check_pair(tx, rx)?;
        let n = tx.len();

        let window = blackman_harris(n);
        let fft = RealFft::new(n);
        let tx_spectrum = fft.forward(&apply_window(tx, &window));
        let rx_spectrum = fft.forward(&apply_window(rx, &window));

        let tx_mag = magnitude(&tx_spectrum);
        let max = tx_mag.iter().copied().fold(0.0, f64::max);
        let peaks = find_peaks(&tx_mag, self.peak_threshold * max);
        tracing::debug!(n, harmonics = peaks.len(), "square-wave harmonics detected");

        Ok(HarmonicSpectra {
            frequencies: frequency_axis(n, self.sample_rate),
            tx: tx_spectrum,
            rx: rx_spectrum,
            peaks,
        })
    }

    /// Ratio of the single DFT terms at the bin nearest `frequency`.
    pub fn single_tone(&self, frequency: f64, tx: &[f64], rx: &[f64]) -> Result<TransferSample> {
        check_pair(tx, rx)?;
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(Error::invalid_parameter(
                "frequency",
                format!("must be positive and finite, got {frequency}"),
            ));
        }
        let n = tx.len();
        let bin = (frequency * n as f64 / self.sample_rate).round() as usize;

        let tx_term = dft_term(tx, bin);
        let rx_term = dft_term(rx, bin);
        if tx_term.norm() == 0.0 {
            return Err(Error::InvalidSignal(format!(
                "transmit capture has no energy at {frequency} Hz (bin {bin})"
            )));
        }
        tracing::debug!(frequency, bin, "single-tone DFT evaluated");
        Ok(TransferSample::new(frequency, rx_term / tx_term))
    }
}

fn check_pair(tx: &[f64], rx: &[f64]) -> Result<()> {
    if tx.is_empty() {
        return Err(Error::InvalidSignal("transmit capture is empty".into()));
    }
    if tx.len() != rx.len() {
        return Err(Error::InvalidSignal(format!(
            "transmit has {} samples but receive has {}",
            tx.len(),
            rx.len()
        )));
    }
    Ok(())
}

/// `(2/N) Σ x[i] e^{-j2πki/N}`.
pub fn dft_term(signal: &[f64], bin: usize) -> Complex64 {
    let n = signal.len() as f64;
    let omega = -2.0 * PI * bin as f64 / n;
    let sum: Complex64 = signal
        .iter()
        .enumerate()
        .map(|(i, &x)| Complex64::from_polar(x, omega * i as f64))
        .sum();
    sum * (2.0 / n)
}

/// Interior bins strictly above both neighbours and above `threshold`.
pub fn find_peaks(data: &[f64], threshold: f64) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    (1..data.len() - 1)
        .filter(|&i| data[i] > data[i - 1] && data[i] > data[i + 1] && data[i] > threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, sample_rate: f64, n: usize, amplitude: f64, phase: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / sample_rate + phase).sin())
            .collect()
    }

    #[test]
    fn find_peaks_strict_and_thresholded() {
        let data = [5.0, 1.0, 3.0, 1.0, 2.0, 2.0, 1.0, 0.5, 9.0];
        // 3.0 qualifies; the 2.0 plateau is not strict; edges excluded.
        assert_eq!(find_peaks(&data, 1.5), vec![2]);
        assert!(find_peaks(&data, 3.0).is_empty());
        assert!(find_peaks(&[1.0, 2.0], 0.0).is_empty());
    }

    #[test]
    fn negative_real_ratio_reports_plus_180() {
        let s = TransferSample::new(10.0, Complex64::new(-2.0, -0.0));
        assert_eq!(s.phase_deg(), 180.0);
        let s = TransferSample::new(10.0, Complex64::new(0.0, -1.0));
        assert!((s.phase_deg() + 90.0).abs() < 1e-12);
    }

    #[test]
    fn waveform_parses_case_insensitively() {
        assert_eq!("Sine".parse::<Waveform>().unwrap(), Waveform::Sine);
        assert_eq!("SQUARE".parse::<Waveform>().unwrap(), Waveform::Square);
        assert!("triangle".parse::<Waveform>().is_err());
    }

    #[test]
    fn dft_term_recovers_amplitude_and_phase() {
        // cos at bin 8 with amplitude 3: term = 3 (phase 0)
        let n = 128;
        let x: Vec<f64> = (0..n)
            .map(|i| 3.0 * (2.0 * PI * 8.0 * i as f64 / n as f64).cos())
            .collect();
        let term = dft_term(&x, 8);
        assert!((term.norm() - 3.0).abs() < 1e-9);
        assert!(term.arg().abs() < 1e-9);
    }

    #[test]
    fn single_tone_measures_gain_and_delay() {
        let fs = 1024.0;
        let n = 1024;
        let cal = SpectralCalibrator::new(fs).unwrap();
        let tx = tone(16.0, fs, n, 1.0, 0.0);
        let rx = tone(16.0, fs, n, 0.5, -PI / 4.0);
        let sample = cal.single_tone(16.0, &tx, &rx).unwrap();
        assert!((sample.amplitude_db() - 20.0 * 0.5f64.log10()).abs() < 1e-9);
        assert!((sample.phase_deg() + 45.0).abs() < 1e-9);
        assert_eq!(sample.frequency, 16.0);
    }

    #[test]
    fn single_tone_rejects_silent_transmitter() {
        let cal = SpectralCalibrator::new(1000.0).unwrap();
        let err = cal.single_tone(10.0, &[0.0; 100], &[1.0; 100]).unwrap_err();
        assert!(matches!(err, Error::InvalidSignal(_)));
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let cal = SpectralCalibrator::default();
        assert!(cal.transfer(Waveform::Square, 1.0, &[1.0; 8], &[1.0; 9]).is_err());
        assert!(cal.transfer(Waveform::Sine, 1.0, &[], &[]).is_err());
    }

    #[test]
    fn square_path_reports_gain_of_scaled_receiver() {
        let fs = 4096.0;
        let n = 4096;
        let tx: Vec<f64> = tone(32.0, fs, n, 1.0, 0.0)
            .iter()
            .zip(tone(96.0, fs, n, 1.0 / 3.0, 0.0))
            .map(|(a, b)| a + b)
            .collect();
        let rx: Vec<f64> = tx.iter().map(|x| -2.0 * x).collect();
        let cal = SpectralCalibrator::new(fs).unwrap();
        let samples = cal.transfer(Waveform::Square, 32.0, &tx, &rx).unwrap();
        assert_eq!(samples.len(), 2);
        for s in samples {
            assert!((s.ratio.norm() - 2.0).abs() < 1e-9);
            assert!((s.phase_deg().abs() - 180.0).abs() < 1e-6);
        }
    }

    #[test]
    fn threshold_validation() {
        let cal = SpectralCalibrator::default();
        assert!(cal.with_peak_threshold(1.5).is_err());
        assert_eq!(cal.with_peak_threshold(0.1).unwrap().peak_threshold(), 0.1);
        assert!(SpectralCalibrator::new(-1.0).is_err());
    }
}
