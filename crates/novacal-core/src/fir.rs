//! Regularized least-squares FIR design over a circular convolution model.
//!
//! Given a stacked coil waveform `s` (length `n`) and an ideal square wave `b`
//! with the same amplitude and offset, the designer finds coefficients `x`
//! such that circularly convolving `s` with `x` approximates `b`:
//!
//! ```text
//! A = toeplitz(s)            A[i][j] = s[(i + j) mod n]
//! (AᵀA + λI) x = Aᵀb         λ = mean(diag(AᵀA)) * regularization
//! ```
//!
//! The damping term keeps the system solvable when `A` is rank deficient,
//! e.g. the even harmonics of an exact half-duty square wave vanish.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Default Tikhonov factor, relative to the mean diagonal of `AᵀA`.
pub const DEFAULT_REGULARIZATION: f64 = 1e-6;

/// Designs and applies correction filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirDesigner {
    regularization: f64,
}

impl Default for FirDesigner {
    fn default() -> Self {
        Self {
            regularization: DEFAULT_REGULARIZATION,
        }
    }
}

impl FirDesigner {
    /// Create a designer with the given relative damping factor.
    pub fn new(regularization: f64) -> Result<Self> {
        if !(regularization.is_finite() && regularization >= 0.0) {
            return Err(Error::invalid_parameter(
                "regularization",
                format!("must be finite and non-negative, got {regularization}"),
            ));
        }
        Ok(Self { regularization })
    }

    /// Relative damping factor.
    pub fn regularization(&self) -> f64 {
        self.regularization
    }

    /// Solve for coefficients mapping `imperfect` onto `perfect`.
    pub fn design(&self, imperfect: &[f64], perfect: &[f64]) -> Result<Vec<f64>> {
        let n = imperfect.len();
        if n == 0 {
            return Err(Error::InvalidSignal("cannot design a filter from an empty waveform".into()));
        }
        if perfect.len() != n {
            return Err(Error::InvalidSignal(format!(
                "waveform has {n} samples but reference has {}",
                perfect.len()
            )));
        }

        let a = toeplitz_matrix(imperfect);
        let b = DVector::from_column_slice(perfect);

        let mut ata = a.tr_mul(&a);
        let atb = a.tr_mul(&b);

        let avg_diag = ata.diagonal().sum() / n as f64;
        let damping = avg_diag * self.regularization;
        for i in 0..n {
            ata[(i, i)] += damping;
        }
        tracing::debug!(n, avg_diag, damping, "solving damped normal equations");

        let x = ata
            .lu()
            .solve(&atb)
            .filter(|x| x.iter().all(|v| v.is_finite()))
            .ok_or(Error::FilterDesignFailed { size: n })?;
        Ok(x.iter().copied().collect())
    }

    /// Build the square-wave reference for `stacked` and design against it.
    pub fn design_for(&self, stacked: &[f64]) -> Result<Vec<f64>> {
        let reference = reference_square_wave(stacked);
        self.design(stacked, &reference)
    }
}

/// Ideal bipolar square wave matching the span of `signal`.
///
/// Samples with `i / n < 0.5` take `offset + amplitude`, the rest
/// `offset - amplitude`, where amplitude and offset come from the signal's
/// extrema.
pub fn reference_square_wave(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = signal.iter().copied().fold(f64::INFINITY, f64::min);
    let amplitude = (max - min) / 2.0;
    let offset = (max + min) / 2.0;

    (0..n)
        .map(|i| {
            if (i as f64) / (n as f64) < 0.5 {
                offset + amplitude
            } else {
                offset - amplitude
            }
        })
        .collect()
}

/// Circulant matrix with row `i` equal to `signal` rotated left by `i`.
pub fn toeplitz_matrix(signal: &[f64]) -> DMatrix<f64> {
    let n = signal.len();
    DMatrix::from_fn(n, n, |i, j| signal[(i + j) % n])
}

/// Circularly convolve `signal` with `coeffs`.
///
/// `y[i] = Σ_j coeffs[j] * signal[(j - i) mod n]`. Both slices must share a
/// length; extra coefficients are ignored.
///
/// For coefficients from [`FirDesigner::design`], `y[i]` approximates the
/// design target at index `(n - i) mod n`.
pub fn apply_fir(signal: &[f64], coeffs: &[f64]) -> Vec<f64> {
    let n = signal.len();
    (0..n)
        .map(|i| {
            coeffs
                .iter()
                .take(n)
                .enumerate()
                .map(|(j, &c)| c * signal[(j + n - i) % n])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toeplitz_rows_rotate_left() {
        let m = toeplitz_matrix(&[1.0, 2.0, 3.0]);
        let rows: Vec<Vec<f64>> = (0..3)
            .map(|i| m.row(i).iter().copied().collect())
            .collect();
        assert_eq!(rows[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(rows[1], vec![2.0, 3.0, 1.0]);
        assert_eq!(rows[2], vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn reference_matches_extrema() {
        let stacked = [0.5, 2.9, 3.0, 1.0, -1.0, -0.8];
        let reference = reference_square_wave(&stacked);
        assert_eq!(reference, vec![3.0, 3.0, 3.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn reference_odd_length_puts_midpoint_low() {
        // i/n < 0.5 for i = 0, 1, 2 of 5.
        let reference = reference_square_wave(&[1.0, 0.0, 0.0, 0.0, -1.0]);
        assert_eq!(reference, vec![1.0, 1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn apply_unit_impulse_negates_index() {
        let signal = [1.0, 2.0, 3.0, 4.0];
        // y[i] = signal[(-i) mod 4]
        assert_eq!(apply_fir(&signal, &[1.0, 0.0, 0.0, 0.0]), vec![1.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn applied_filter_traces_target_in_negated_order() {
        let imperfect = [4.0, 1.0, 0.5, 0.25, 0.0];
        let target = [1.0, -2.0, 0.5, 3.0, 0.0];
        let coeffs = FirDesigner::new(0.0).unwrap().design(&imperfect, &target).unwrap();
        let y = apply_fir(&imperfect, &coeffs);
        for i in 0..5 {
            let want = target[(5 - i) % 5];
            assert!((y[i] - want).abs() < 1e-9, "y[{i}] = {} vs {want}", y[i]);
        }
    }

    #[test]
    fn apply_delayed_impulse_rotates() {
        let signal = [1.0, 2.0, 3.0, 4.0];
        // y[i] = signal[(1 - i) mod 4]
        assert_eq!(apply_fir(&signal, &[0.0, 1.0, 0.0, 0.0]), vec![2.0, 1.0, 4.0, 3.0]);
    }

    #[test]
    fn design_recovers_exact_inverse_of_invertible_system() {
        // Diagonally dominant circulant: well conditioned.
        let imperfect = [4.0, 1.0, 0.5, 0.25, 0.0];
        let target = [1.0, -2.0, 0.5, 3.0, 0.0];
        let designer = FirDesigner::new(0.0).unwrap();
        let coeffs = designer.design(&imperfect, &target).unwrap();
        let a = toeplitz_matrix(&imperfect);
        let fitted = &a * DVector::from_column_slice(&coeffs);
        for (f, t) in fitted.iter().zip(target) {
            assert!((f - t).abs() < 1e-9, "{f} vs {t}");
        }
    }

    #[test]
    fn zero_waveform_without_damping_is_singular() {
        let designer = FirDesigner::new(0.0).unwrap();
        let err = designer.design(&[0.0; 4], &[1.0, 1.0, -1.0, -1.0]).unwrap_err();
        assert!(matches!(err, Error::FilterDesignFailed { size: 4 }));
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = FirDesigner::default().design(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidSignal(_)));
        assert!(FirDesigner::default().design(&[], &[]).is_err());
    }

    #[test]
    fn negative_regularization_rejected() {
        assert!(FirDesigner::new(-1.0).is_err());
        assert!(FirDesigner::new(f64::INFINITY).is_err());
    }
}
