//! Headerless capture files: consecutive little-endian IEEE-754 `f32` samples.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use novacal_core::SignalSource;

use crate::{Error, Result};

/// Size of one stored sample.
pub const BYTES_PER_SAMPLE: usize = 4;

/// Read every sample of a capture file, widened to `f64`.
///
/// A file whose size is not a multiple of [`BYTES_PER_SAMPLE`] is rejected
/// with [`Error::Truncated`].
pub fn read_capture(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(Error::Truncated {
            path: path.to_path_buf(),
            len: bytes.len() as u64,
        });
    }

    let samples: Vec<f64> = bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| f64::from(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect();
    tracing::debug!(path = %path.display(), samples = samples.len(), "capture read");
    Ok(samples)
}

/// Write samples in capture format, narrowing to `f32`.
pub fn write_capture(path: impl AsRef<Path>, samples: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for &sample in samples {
        writer
            .write_all(&(sample as f32).to_le_bytes())
            .map_err(|e| Error::io(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    tracing::debug!(path = %path.display(), samples = samples.len(), "capture written");
    Ok(())
}

/// [`SignalSource`] reading capture files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFileSource;

impl SignalSource for BinaryFileSource {
    fn read(&self, path: &Path) -> novacal_core::Result<Vec<f64>> {
        read_capture(path).map_err(Error::into_core)
    }
}
