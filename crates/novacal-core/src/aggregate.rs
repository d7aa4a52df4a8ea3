//! Cross-task accumulation and the final per-coil calibration curves.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::phase::{center, unwrap_degrees};
use crate::spectral::TransferSample;

/// Transfer-sample batches keyed by coil name.
pub type CoilBatches = BTreeMap<String, Vec<Vec<TransferSample>>>;

/// Per-coil collection of transfer-sample batches filled by concurrent tasks.
///
/// Appends are serialized by an internal mutex. Once every writer is done,
/// [`CoilAccumulator::into_batches`] hands out the contents without locking.
#[derive(Debug, Default)]
pub struct CoilAccumulator {
    coils: Mutex<CoilBatches>,
}

impl CoilAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one task's batch to `coil`.
    pub fn append(&self, coil: &str, batch: Vec<TransferSample>) {
        let mut coils = self.coils.lock();
        coils.entry(coil.to_owned()).or_default().push(batch);
    }

    /// Number of coils that received at least one batch.
    pub fn coil_count(&self) -> usize {
        self.coils.lock().len()
    }

    /// Consume the accumulator.
    pub fn into_batches(self) -> CoilBatches {
        self.coils.into_inner()
    }
}

/// Amplitude and phase response of one coil, sorted by frequency.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationCurve {
    /// Frequencies in Hz, ascending.
    pub frequencies: Vec<f64>,
    /// Gain in dB at each frequency.
    pub amplitudes: Vec<f64>,
    /// Unwrapped, zero-mean phase in degrees at each frequency.
    pub phases: Vec<f64>,
}

impl CalibrationCurve {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// True when the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Iterate `(frequency, amplitude_db, phase_deg)` triples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.frequencies
            .iter()
            .zip(&self.amplitudes)
            .zip(&self.phases)
            .map(|((&f, &a), &p)| (f, a, p))
    }
}

/// Canonical order: frequency, then ratio real and imaginary parts.
fn sample_order(a: &TransferSample, b: &TransferSample) -> Ordering {
    a.frequency
        .total_cmp(&b.frequency)
        .then_with(|| a.ratio.re.total_cmp(&b.ratio.re))
        .then_with(|| a.ratio.im.total_cmp(&b.ratio.im))
}

/// Merge every batch contributed for `coil` into one curve.
pub fn aggregate_coil(coil: &str, batches: &[Vec<TransferSample>]) -> Result<CalibrationCurve> {
    let mut samples: Vec<TransferSample> = batches.iter().flatten().copied().collect();
    if samples.is_empty() {
        return Err(Error::NoDataForCoil(coil.to_owned()));
    }
    samples.sort_by(sample_order);

    let frequencies = samples.iter().map(|s| s.frequency).collect();
    let amplitudes = samples.iter().map(TransferSample::amplitude_db).collect();
    let wrapped: Vec<f64> = samples.iter().map(TransferSample::phase_deg).collect();
    let mut phases = unwrap_degrees(&wrapped);
    center(&mut phases);

    tracing::debug!(coil, points = samples.len(), "aggregated calibration curve");
    Ok(CalibrationCurve {
        frequencies,
        amplitudes,
        phases,
    })
}

/// Build a curve for every coil; fails on the first coil without data.
pub fn aggregate(batches: &CoilBatches) -> Result<BTreeMap<String, CalibrationCurve>> {
    let mut curves = BTreeMap::new();
    for (coil, coil_batches) in batches {
        curves.insert(coil.clone(), aggregate_coil(coil, coil_batches)?);
    }
    if curves.is_empty() {
        return Err(Error::NoCalibrationResults);
    }
    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::num_complex::Complex64;

    fn polar_deg(freq: f64, gain: f64, phase_deg: f64) -> TransferSample {
        TransferSample::new(freq, Complex64::from_polar(gain, phase_deg.to_radians()))
    }

    #[test]
    fn curve_is_sorted_and_converted() {
        let batches = vec![
            vec![polar_deg(300.0, 0.1, 10.0)],
            vec![polar_deg(100.0, 1.0, 30.0), polar_deg(200.0, 10.0, 20.0)],
        ];
        let curve = aggregate_coil("HX", &batches).unwrap();
        assert_eq!(curve.frequencies, vec![100.0, 200.0, 300.0]);
        let expected_amp = [0.0, 20.0, -20.0];
        let expected_phase = [10.0, 0.0, -10.0];
        for i in 0..3 {
            assert!((curve.amplitudes[i] - expected_amp[i]).abs() < 1e-9);
            assert!((curve.phases[i] - expected_phase[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn wrapped_phase_is_unwrapped_then_centered() {
        let batches = vec![vec![
            polar_deg(1.0, 1.0, 170.0),
            polar_deg(2.0, 1.0, -170.0),
            polar_deg(3.0, 1.0, 170.0),
        ]];
        let curve = aggregate_coil("HZ", &batches).unwrap();
        // [170, 190, 170] minus mean 176.67
        let mean = 530.0 / 3.0;
        let expected = [170.0 - mean, 190.0 - mean, 170.0 - mean];
        for (got, want) in curve.phases.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    #[test]
    fn empty_coil_is_an_error() {
        let err = aggregate_coil("HY", &[vec![], vec![]]).unwrap_err();
        assert!(matches!(err, Error::NoDataForCoil(ref c) if c == "HY"));
    }

    #[test]
    fn no_coils_is_no_results() {
        let err = aggregate(&CoilBatches::new()).unwrap_err();
        assert!(matches!(err, Error::NoCalibrationResults));
    }

    #[test]
    fn accumulator_groups_by_coil() {
        let acc = CoilAccumulator::new();
        acc.append("HX", vec![polar_deg(1.0, 1.0, 0.0)]);
        acc.append("HY", vec![polar_deg(2.0, 1.0, 0.0)]);
        acc.append("HX", vec![polar_deg(3.0, 1.0, 0.0)]);
        assert_eq!(acc.coil_count(), 2);
        let batches = acc.into_batches();
        assert_eq!(batches["HX"].len(), 2);
        assert_eq!(batches["HY"].len(), 1);
    }

    #[test]
    fn equal_frequencies_sort_deterministically() {
        let a = polar_deg(5.0, 2.0, 0.0);
        let b = polar_deg(5.0, 1.0, 0.0);
        let one = aggregate_coil("C", &[vec![a], vec![b]]).unwrap();
        let two = aggregate_coil("C", &[vec![b], vec![a]]).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn points_iterates_triples() {
        let curve = CalibrationCurve {
            frequencies: vec![1.0, 2.0],
            amplitudes: vec![0.5, 0.25],
            phases: vec![-1.0, 1.0],
        };
        let points: Vec<_> = curve.points().collect();
        assert_eq!(points, vec![(1.0, 0.5, -1.0), (2.0, 0.25, 1.0)]);
        assert_eq!(curve.len(), 2);
        assert!(!curve.is_empty());
    }
}
