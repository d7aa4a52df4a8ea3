//! End-to-end FIR correction for one station capture.

use std::path::PathBuf;

use crate::error::Result;
use crate::fir::{FirDesigner, apply_fir, reference_square_wave};
use crate::orchestrator::{ProgressSink, SignalSource};
use crate::stack::WaveformStacker;

/// Inputs for one FIR computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FirJob {
    /// Coil identifier, used for naming artifacts.
    pub coil_name: String,
    /// Fundamental frequency of the square-wave stimulus (Hz).
    pub base_frequency: f64,
    /// Capture sample rate (Hz).
    pub sample_rate: f64,
    /// Capture file name inside `folder`.
    pub channel: String,
    /// Station folder holding the capture.
    pub folder: PathBuf,
}

impl FirJob {
    /// Full path of the coil capture.
    pub fn capture_path(&self) -> PathBuf {
        self.folder.join(&self.channel)
    }
}

/// Products of a FIR computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FirOutcome {
    /// Correction filter, one coefficient per lag.
    pub coefficients: Vec<f64>,
    /// Stacked, resampled coil waveform.
    pub stacked: Vec<f64>,
    /// Ideal square wave the filter targets.
    pub reference: Vec<f64>,
    /// Stacked waveform after correction.
    pub filtered: Vec<f64>,
}

impl FirOutcome {
    /// RMS difference between the corrected waveform and the reference.
    ///
    /// `filtered[i]` tracks `reference[(n - i) mod n]`, so that is the pairing
    /// compared.
    pub fn residual_rms(&self) -> f64 {
        let n = self.filtered.len();
        if n == 0 || self.reference.len() != n {
            return 0.0;
        }
        let sum: f64 = self
            .filtered
            .iter()
            .enumerate()
            .map(|(i, y)| {
                let r = self.reference[(n - i) % n];
                (y - r) * (y - r)
            })
            .sum();
        (sum / n as f64).sqrt()
    }
}

/// Stacks a capture and designs its correction filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FirPipeline {
    stacker: WaveformStacker,
    designer: FirDesigner,
}

impl FirPipeline {
    /// Combine a stacker and a designer.
    pub fn new(stacker: WaveformStacker, designer: FirDesigner) -> Self {
        Self { stacker, designer }
    }

    /// Run `job`, reporting progress at fixed milestones up to 100.
    pub fn run<S, P>(&self, job: &FirJob, source: &S, progress: &P) -> Result<FirOutcome>
    where
        S: SignalSource + ?Sized,
        P: ProgressSink + ?Sized,
    {
        progress.report(10);
        let path = job.capture_path();
        tracing::info!(coil = %job.coil_name, capture = %path.display(), "starting FIR design");

        let capture = source.read(&path)?;
        progress.report(30);
        tracing::debug!(samples = capture.len(), "capture loaded");
        progress.report(50);

        let stacked = self
            .stacker
            .stack(&capture, job.sample_rate, job.base_frequency)?;
        progress.report(70);

        let outcome = self.correct(stacked)?;
        progress.report(80);

        tracing::info!(
            coil = %job.coil_name,
            taps = outcome.coefficients.len(),
            residual_rms = outcome.residual_rms(),
            "FIR design finished"
        );
        progress.report(100);
        Ok(outcome)
    }

    /// Stack, design and apply on an in-memory capture.
    pub fn process(&self, capture: &[f64], sample_rate: f64, base_frequency: f64) -> Result<FirOutcome> {
        let stacked = self.stacker.stack(capture, sample_rate, base_frequency)?;
        self.correct(stacked)
    }

    fn correct(&self, stacked: Vec<f64>) -> Result<FirOutcome> {
        let reference = reference_square_wave(&stacked);
        let coefficients = self.designer.design(&stacked, &reference)?;
        let filtered = apply_fir(&stacked, &coefficients);
        Ok(FirOutcome {
            coefficients,
            stacked,
            reference,
            filtered,
        })
    }
}
