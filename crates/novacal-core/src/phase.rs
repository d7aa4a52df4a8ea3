//! Phase unwrapping and centering in degrees.
//!
//! Transfer-function phases come out of `arg()` wrapped to (-180°, 180°].
//! Sorting samples by frequency and unwrapping them reconstructs a continuous
//! curve; removing the mean then drops the constant offset, which carries no
//! information for relative calibration.

/// Full turn in degrees.
const TURN_DEG: f64 = 360.0;

/// Jump detection threshold in degrees.
const HALF_TURN_DEG: f64 = 180.0;

/// Unwrap a sequence of phases in degrees.
///
/// Whenever the raw difference between consecutive samples exceeds +180°,
/// 360° is subtracted from that sample and every later one; below -180°,
/// 360° is added. Consecutive outputs therefore never differ by more than
/// 180° in magnitude.
pub fn unwrap_degrees(phase: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(phase.len());
    let Some(&first) = phase.first() else {
        return unwrapped;
    };
    unwrapped.push(first);

    let mut correction = 0.0;
    for pair in phase.windows(2) {
        let diff = pair[1] - pair[0];
        if diff > HALF_TURN_DEG {
            correction -= TURN_DEG;
        } else if diff < -HALF_TURN_DEG {
            correction += TURN_DEG;
        }
        unwrapped.push(pair[1] + correction);
    }

    unwrapped
}

/// Subtract the arithmetic mean from every sample, in place.
pub fn center(phase: &mut [f64]) {
    if phase.is_empty() {
        return;
    }
    let mean = phase.iter().sum::<f64>() / phase.len() as f64;
    for p in phase.iter_mut() {
        *p -= mean;
    }
}

/// Wrap an angle in degrees into (-180, 180].
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + HALF_TURN_DEG).rem_euclid(TURN_DEG) - HALF_TURN_DEG;
    if wrapped == -HALF_TURN_DEG {
        HALF_TURN_DEG
    } else {
        wrapped
    }
}
