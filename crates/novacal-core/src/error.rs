//! Error types for the calibration engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::spectral::Waveform;

/// Errors produced by the stacking, filter-design and calibration stages.
#[derive(Debug, Error)]
pub enum Error {
    /// A capture file was missing, unreadable or truncated.
    #[error("failed to read capture '{path}': {source}")]
    Io {
        /// Path of the capture that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Zero-crossing detection found no complete cycle to stack.
    #[error("no periodic signal: zero-crossing detection found no usable cycles")]
    NoPeriodicSignal,

    /// The damped normal equations could not be solved.
    #[error("FIR design failed: damped {size}x{size} normal equations are singular")]
    FilterDesignFailed {
        /// Dimension of the system.
        size: usize,
    },

    /// Aggregation found no transfer samples for a coil.
    #[error("no data for coil {0}")]
    NoDataForCoil(String),

    /// Aggregation produced no curve at all.
    #[error("no calibration results calculated")]
    NoCalibrationResults,

    /// Input signals cannot be processed (empty, mismatched, silent stimulus).
    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    /// A numeric parameter is out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A calibration task failed; wraps the cause with the task identity.
    #[error("error processing {waveform} wave for coil {coil} at {frequency} Hz: {source}")]
    Task {
        /// Coil the task belonged to.
        coil: String,
        /// Stimulus type of the task.
        waveform: Waveform,
        /// Nominal stimulus frequency in Hz.
        frequency: f64,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// A calibration task panicked before reporting a result.
    #[error("calibration task for coil {coil} panicked")]
    TaskPanicked {
        /// Coil the task belonged to.
        coil: String,
    },

    /// A run was executed more than once.
    #[error("calibration run already executed (state: {0})")]
    RunNotIdle(&'static str),
}

impl Error {
    /// Create an I/O error for a capture path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Returns the innermost cause, looking through [`Error::Task`] wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Task { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
