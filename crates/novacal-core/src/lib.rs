//! Novacal Core - signal processing for induction-coil calibration
//!
//! Two workflows share this crate:
//!
//! - **FIR correction**: a coil's square-wave response is stacked into one
//!   representative cycle, and a circular FIR filter is fitted that maps it
//!   back onto an ideal square wave.
//! - **Transfer-function calibration**: transmit/receive capture pairs are
//!   turned into complex gain samples, then merged into per-coil amplitude
//!   (dB) and phase (degrees) curves.
//!
//! Modules:
//!
//! - [`stack`] - zero-crossing cycle stacking and linear resampling
//! - [`fir`] - circulant Toeplitz matrix, least-squares filter design, filtering
//! - [`fir_job`] - the FIR workflow end to end, with progress milestones
//! - [`fft`] - Blackman-Harris window and a real-input FFT wrapper
//! - [`spectral`] - harmonic and single-tone transfer extraction
//! - [`phase`] - degree unwrapping and centering
//! - [`aggregate`] - per-coil accumulation and curve construction
//! - [`orchestrator`] - concurrent calibration runs with progress reporting
//!
//! ## Example
//!
//! ```rust,ignore
//! use novacal_core::{CalibrationRequest, CalibrationRun, CalibrationTask, SpectralCalibrator, Waveform};
//!
//! let request = CalibrationRequest::new([
//!     CalibrationTask::new("HX", 128.0, Waveform::Square, "tx_128.bin", "rx_128.bin"),
//!     CalibrationTask::new("HX", 4096.0, Waveform::Sine, "tx_4k.bin", "rx_4k.bin"),
//! ]);
//! let mut run = CalibrationRun::new(request, SpectralCalibrator::default());
//! let curves = run.execute(&source, &|pct: u8| println!("{pct}%"))?;
//! ```

pub mod aggregate;
pub mod error;
pub mod fft;
pub mod fir;
pub mod fir_job;
pub mod orchestrator;
pub mod phase;
pub mod spectral;
pub mod stack;

pub use aggregate::{CalibrationCurve, CoilAccumulator, CoilBatches, aggregate, aggregate_coil};
pub use error::{Error, Result};
pub use fir::{DEFAULT_REGULARIZATION, FirDesigner, apply_fir, reference_square_wave, toeplitz_matrix};
pub use fir_job::{FirJob, FirOutcome, FirPipeline};
pub use orchestrator::{
    CalibrationRequest, CalibrationRun, CalibrationTask, ChannelProgress, MemorySource,
    ProgressSink, RunState, SignalSource,
};
pub use phase::{center, unwrap_degrees, wrap_degrees};
pub use spectral::{
    DEFAULT_PEAK_THRESHOLD, DEFAULT_SAMPLE_RATE, HarmonicSpectra, SpectralCalibrator,
    TransferSample, Waveform,
};
pub use stack::{DEFAULT_STACK_SAMPLES, WaveformStacker};

pub use rustfft::num_complex::Complex64;
