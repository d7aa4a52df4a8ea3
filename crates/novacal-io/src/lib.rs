//! File I/O layer for the Novacal calibration engine.
//!
//! This crate provides:
//!
//! - **Captures**: [`read_capture`] and [`write_capture`] for headerless
//!   little-endian `f32` sample files, plus [`BinaryFileSource`] which plugs
//!   them into a core calibration run
//! - **Exporters**: FIR coefficient tables, calibration curves as CSV or FRD
//! - **Time-series views**: [`read_range`] and [`read_and_downsample`] for
//!   browsing long captures without loading every sample
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use novacal_io::{BinaryFileSource, export_curve_csv};
//!
//! let curves = run.execute(&BinaryFileSource, &|_: u8| {})?;
//! for (coil, curve) in &curves {
//!     export_curve_csv(format!("{coil}.csv"), curve)?;
//! }
//! ```

use std::path::{Path, PathBuf};

mod binary;
mod export;
mod timeseries;

pub use binary::{BYTES_PER_SAMPLE, BinaryFileSource, read_capture, write_capture};
pub use export::{
    coefficient_file_name, export_coefficients_csv, export_curve_csv, export_curve_frd,
    import_frd,
};
pub use timeseries::{DECIMATION_MIN_POINTS, TimeSeries, read_and_downsample, read_range, total_length};

/// Error types for capture and export I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file size is not a whole number of samples.
    #[error("{path} is {len} bytes, not a multiple of {BYTES_PER_SAMPLE}")]
    Truncated {
        /// Capture file.
        path: PathBuf,
        /// File size in bytes.
        len: u64,
    },

    /// A sample index range selects nothing.
    #[error("invalid index range: start={start}, end={end}")]
    InvalidRange {
        /// Requested first index.
        start: usize,
        /// Requested end index (exclusive), after clamping.
        end: usize,
    },

    /// A line of an FRD file could not be parsed.
    #[error("{path}:{line}: expected `frequency magnitude_db phase_deg`")]
    MalformedFrd {
        /// FRD file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
    },

    /// Error raised by the core engine.
    #[error(transparent)]
    Core(#[from] novacal_core::Error),
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Convert into the core error type, keeping the offending path.
    pub fn into_core(self) -> novacal_core::Error {
        match self {
            Error::Io { path, source } => novacal_core::Error::io(path, source),
            Error::Truncated { path, len } => novacal_core::Error::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{len} bytes is not a whole number of samples"),
                ),
            ),
            Error::Core(err) => err,
            other => novacal_core::Error::InvalidSignal(other.to_string()),
        }
    }
}

/// Convenience result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
