//! Property-based tests for novacal-core.
//!
//! Covers stacking output length, phase unwrapping continuity and the
//! order independence of curve aggregation.

use std::f64::consts::PI;

use novacal_core::stack::resample_linear;
use novacal_core::{Complex64, TransferSample, WaveformStacker, aggregate_coil, unwrap_degrees};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Linear resampling always yields the requested number of points.
    #[test]
    fn resample_length_is_fixed(
        cycle in prop::collection::vec(-10.0f64..10.0, 1..512),
        n_samples in 1usize..4096,
    ) {
        let out = resample_linear(&cycle, n_samples);
        prop_assert_eq!(out.len(), n_samples);
        prop_assert!(out.iter().all(|v| v.is_finite()));
    }

    /// Stacking any periodic capture yields exactly `n_samples` points,
    /// whatever the period and capture length.
    #[test]
    fn stacked_length_ignores_capture_shape(
        period in 4usize..96,
        cycles in 3usize..24,
        n_samples in 1usize..3000,
        phase in 0.1f64..1.4,
    ) {
        let sample_rate = 9600.0;
        let fundamental = sample_rate / period as f64;
        let capture: Vec<f64> = (0..period * cycles)
            .map(|i| (2.0 * PI * i as f64 / period as f64 + phase).sin())
            .collect();

        let stacker = WaveformStacker::new(n_samples).unwrap();
        let stacked = stacker.stack(&capture, sample_rate, fundamental).unwrap();
        prop_assert_eq!(stacked.len(), n_samples);
    }

    /// Unwrapped phase never jumps by more than half a turn and differs from
    /// the raw phase by whole turns.
    #[test]
    fn unwrap_is_continuous(raw in prop::collection::vec(-179.9f64..180.0, 0..256)) {
        let unwrapped = unwrap_degrees(&raw);
        prop_assert_eq!(unwrapped.len(), raw.len());
        for w in unwrapped.windows(2) {
            prop_assert!((w[1] - w[0]).abs() <= 180.0 + 1e-9, "jump {} -> {}", w[0], w[1]);
        }
        for (u, r) in unwrapped.iter().zip(&raw) {
            let turns = (u - r) / 360.0;
            prop_assert!((turns - turns.round()).abs() < 1e-9);
        }
    }

    /// Splitting the same samples into batches in any order gives the same curve.
    #[test]
    fn aggregation_ignores_batch_order(
        points in prop::collection::vec((0u8..16, 0.01f64..10.0, -PI..PI), 1..64),
        split in 1usize..8,
    ) {
        let samples: Vec<TransferSample> = points
            .iter()
            .map(|&(bin, gain, phase)| {
                TransferSample::new(f64::from(bin) * 25.0, Complex64::from_polar(gain, phase))
            })
            .collect();

        let forward: Vec<Vec<TransferSample>> = samples.chunks(split).map(<[_]>::to_vec).collect();
        let mut backward: Vec<Vec<TransferSample>> = forward.clone();
        backward.reverse();
        for batch in &mut backward {
            batch.reverse();
        }

        let a = aggregate_coil("HX", &forward).unwrap();
        let b = aggregate_coil("HX", &backward).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert!(a.frequencies.windows(2).all(|w| w[0] <= w[1]));
    }
}
