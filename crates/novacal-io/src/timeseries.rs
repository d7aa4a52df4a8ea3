//! Windowed reads and min/max decimation for browsing long captures.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::binary::BYTES_PER_SAMPLE;
use crate::{Error, Result};

/// Views shorter than this are returned without decimation.
pub const DECIMATION_MIN_POINTS: usize = 10_000;

/// Sample values paired with their sample indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    /// Sample index of each value, as read from its file.
    pub times: Vec<f64>,
    /// Sample values.
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, time: f64, value: f64) {
        self.times.push(time);
        self.values.push(value);
    }

    fn extend(&mut self, other: TimeSeries) {
        self.times.extend(other.times);
        self.values.extend(other.values);
    }
}

/// Total number of samples across `paths`, from file sizes alone.
pub fn total_length<P: AsRef<Path>>(paths: &[P]) -> Result<u64> {
    let mut total = 0;
    for path in paths {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
        total += meta.len() / BYTES_PER_SAMPLE as u64;
    }
    Ok(total)
}

/// Read samples `start..end` of one capture.
///
/// `end` is clamped to the file length and `None` means the end of the file.
/// An empty range after clamping is an [`Error::InvalidRange`]. A short read
/// returns the samples that were available.
pub fn read_range(path: impl AsRef<Path>, start: usize, end: Option<usize>) -> Result<TimeSeries> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let len = file.metadata().map_err(|e| Error::io(path, e))?.len();
    let total = (len / BYTES_PER_SAMPLE as u64) as usize;

    let end = end.filter(|&e| e > 0 && e <= total).unwrap_or(total);
    if start >= end {
        return Err(Error::InvalidRange { start, end });
    }

    let wanted = (end - start) * BYTES_PER_SAMPLE;
    let mut bytes = Vec::with_capacity(wanted);
    file.seek(SeekFrom::Start((start * BYTES_PER_SAMPLE) as u64))
        .map_err(|e| Error::io(path, e))?;
    file.take(wanted as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(path, e))?;

    let mut series = TimeSeries::default();
    for (i, chunk) in bytes.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        series.push((start + i) as f64, f64::from(value));
    }
    tracing::debug!(path = %path.display(), start, end, points = series.len(), "range read");
    Ok(series)
}

/// Read `start..end` of every capture, concatenate, and decimate.
///
/// The decision to decimate depends on the window, not on the concatenated
/// total: when the widest per-file window holds fewer than
/// [`DECIMATION_MIN_POINTS`] points, or `factor <= 1`, the data comes back
/// untouched. Otherwise each run of `factor` points is reduced to its first
/// point, its interior minimum and maximum, and its last point.
pub fn read_and_downsample<P: AsRef<Path>>(
    paths: &[P],
    start: usize,
    end: Option<usize>,
    factor: usize,
) -> Result<TimeSeries> {
    let mut all = TimeSeries::default();
    let mut window = 0;
    for path in paths {
        let series = read_range(path, start, end)?;
        window = window.max(series.len());
        all.extend(series);
    }

    if factor <= 1 || window < DECIMATION_MIN_POINTS {
        return Ok(all);
    }
    let decimated = decimate(&all, factor);
    tracing::debug!(points = all.len(), kept = decimated.len(), factor, "view decimated");
    Ok(decimated)
}

/// Min/max decimation over consecutive segments of `factor` points.
fn decimate(series: &TimeSeries, factor: usize) -> TimeSeries {
    let mut out = TimeSeries::default();
    for (times, values) in series.times.chunks(factor).zip(series.values.chunks(factor)) {
        let last = values.len() - 1;
        out.push(times[0], values[0]);

        if values.len() > 2 {
            let (mut min_idx, mut max_idx) = (1, 1);
            for j in 1..last {
                if values[j] < values[min_idx] {
                    min_idx = j;
                }
                if values[j] > values[max_idx] {
                    max_idx = j;
                }
            }
            out.push(times[min_idx], values[min_idx]);
            if max_idx != min_idx {
                out.push(times[max_idx], values[max_idx]);
            }
        }

        if last > 0 {
            out.push(times[last], values[last]);
        }
    }
    out
}
