//! Result exporters.
//!
//! - Coefficient tables as CSV (`Index,Coefficient`)
//! - Calibration curves as CSV (`Frequency,Amplitude,Phase`)
//! - Calibration curves as FRD (frequency response data, compatible with REW)

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use novacal_core::CalibrationCurve;

use crate::{Error, Result};

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::io(path, e))
}

/// Name of the coefficient table for `coil`, stamped with `timestamp`.
pub fn coefficient_file_name(coil: &str, timestamp: &str) -> String {
    format!("fir_coefficients_{coil}_{timestamp}.csv")
}

/// Write FIR coefficients, one row per lag, at full precision.
pub fn export_coefficients_csv(path: impl AsRef<Path>, coefficients: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    let mut write = || -> std::io::Result<()> {
        writeln!(file, "Index,Coefficient")?;
        for (i, c) in coefficients.iter().enumerate() {
            writeln!(file, "{i},{c}")?;
        }
        file.flush()
    };
    write().map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), taps = coefficients.len(), "coefficients exported");
    Ok(())
}

/// Write a calibration curve as `Frequency,Amplitude,Phase` rows.
pub fn export_curve_csv(path: impl AsRef<Path>, curve: &CalibrationCurve) -> Result<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    let mut write = || -> std::io::Result<()> {
        writeln!(file, "Frequency,Amplitude,Phase")?;
        for (freq, amp, phase) in curve.points() {
            writeln!(file, "{freq},{amp},{phase}")?;
        }
        file.flush()
    };
    write().map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), points = curve.len(), "curve exported");
    Ok(())
}

/// Export a calibration curve to FRD format (REW compatible).
///
/// FRD is a simple text format:
/// - One measurement per line
/// - Three space-separated values: frequency_hz magnitude_db phase_deg
/// - Lines starting with `*` or `#` are comments
pub fn export_curve_frd(path: impl AsRef<Path>, curve: &CalibrationCurve) -> Result<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    let mut write = || -> std::io::Result<()> {
        writeln!(file, "* Frequency Response Data exported by novacal")?;
        for (freq, amp, phase) in curve.points() {
            writeln!(file, "{freq:.6} {amp:.6} {phase:.6}")?;
        }
        file.flush()
    };
    write().map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), points = curve.len(), "FRD exported");
    Ok(())
}

/// Import a curve from FRD format.
///
/// Blank and comment lines are skipped. Columns beyond the third are ignored;
/// a data line with fewer than three numeric columns is an error.
pub fn import_frd(path: impl AsRef<Path>) -> Result<CalibrationCurve> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(file);

    let mut curve = CalibrationCurve::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('*') {
            continue;
        }

        let mut fields = line.split_whitespace().map(str::parse::<f64>);
        let (Some(Ok(freq)), Some(Ok(mag)), Some(Ok(phase))) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::MalformedFrd {
                path: path.to_path_buf(),
                line: index + 1,
            });
        };
        curve.frequencies.push(freq);
        curve.amplitudes.push(mag);
        curve.phases.push(phase);
    }

    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_curve() -> CalibrationCurve {
        CalibrationCurve {
            frequencies: vec![16.0, 48.0, 80.0],
            amplitudes: vec![0.0, -3.5, -12.25],
            phases: vec![10.0, 0.0, -10.0],
        }
    }

    #[test]
    fn coefficient_file_name_format() {
        assert_eq!(
            coefficient_file_name("HX", "1700000000"),
            "fir_coefficients_HX_1700000000.csv"
        );
    }

    #[test]
    fn coefficients_csv_keeps_full_precision() {
        let file = NamedTempFile::new().unwrap();
        export_coefficients_csv(file.path(), &[1.0, -0.123456789012345, 2.5e-9]).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Index,Coefficient");
        assert_eq!(lines[1], "0,1");
        assert_eq!(lines[2], "1,-0.123456789012345");
        let parsed: f64 = lines[3].split(',').nth(1).unwrap().parse().unwrap();
        assert_eq!(parsed, 2.5e-9);
    }

    #[test]
    fn curve_csv_rows() {
        let file = NamedTempFile::new().unwrap();
        export_curve_csv(file.path(), &sample_curve()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["Frequency,Amplitude,Phase", "16,0,10", "48,-3.5,0", "80,-12.25,-10"]);
    }

    #[test]
    fn frd_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let curve = sample_curve();
        export_curve_frd(file.path(), &curve).unwrap();
        let loaded = import_frd(file.path()).unwrap();
        assert_eq!(loaded.len(), curve.len());
        for (a, b) in loaded.points().zip(curve.points()) {
            assert!((a.0 - b.0).abs() < 1e-6);
            assert!((a.1 - b.1).abs() < 1e-6);
            assert!((a.2 - b.2).abs() < 1e-6);
        }
    }

    #[test]
    fn frd_rejects_short_line() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "* header\n\n100 -1 5\n200 -2\n").unwrap();
        let err = import_frd(file.path()).unwrap_err();
        assert!(matches!(err, Error::MalformedFrd { line: 4, .. }));
    }
}
