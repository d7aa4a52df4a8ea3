//! Transfer-function calibration command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use novacal_config::CalibrationPlan;
use novacal_core::{CalibrationCurve, CalibrationRun, ChannelProgress};
use novacal_io::{BinaryFileSource, export_curve_csv, export_curve_frd};
use serde::Serialize;

use super::common;

#[derive(Clone, Copy, ValueEnum)]
enum CurveFormat {
    /// Frequency,Amplitude,Phase CSV
    Csv,
    /// Frequency response data for circuit simulators
    Frd,
}

impl CurveFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Frd => "frd",
        }
    }
}

#[derive(Args)]
pub struct CalibrateArgs {
    /// Calibration plan (TOML) with one [[tasks]] entry per capture pair
    #[arg(long, value_name = "FILE")]
    plan: PathBuf,

    /// Directory receiving one curve file per coil
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Curve file format
    #[arg(long, value_enum, default_value = "csv")]
    format: CurveFormat,

    /// Print the curves as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct CurveReport<'a> {
    coil: &'a str,
    frequencies: &'a [f64],
    amplitudes: &'a [f64],
    phases: &'a [f64],
}

impl<'a> CurveReport<'a> {
    fn new(coil: &'a str, curve: &'a CalibrationCurve) -> Self {
        Self {
            coil,
            frequencies: &curve.frequencies,
            amplitudes: &curve.amplitudes,
            phases: &curve.phases,
        }
    }
}

pub fn run(args: CalibrateArgs, settings: Option<&Path>) -> anyhow::Result<()> {
    let settings = common::load_settings(settings)?;
    let plan = CalibrationPlan::load(&args.plan)
        .with_context(|| format!("loading calibration plan {}", args.plan.display()))?;
    let request = plan.to_request()?;
    let mut calibration = CalibrationRun::new(request, settings.calibrator()?);

    tracing::info!(tasks = calibration.total_tasks(), plan = %args.plan.display(), "calibration plan ready");

    let pb = common::percent_bar("calibrate");
    let (sink, updates) = ChannelProgress::bounded(64);
    let result = std::thread::scope(|scope| {
        let drain = scope.spawn(|| {
            for percent in &updates {
                pb.set_position(u64::from(percent));
            }
        });
        let result = calibration.execute(&BinaryFileSource, &sink);
        drop(sink);
        if drain.join().is_err() {
            tracing::warn!("progress display thread panicked");
        }
        result
    });
    pb.finish_and_clear();
    let curves = result.context("calibration run failed")?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    for (coil, curve) in &curves {
        let path = args
            .output_dir
            .join(format!("calibration_{coil}.{}", args.format.extension()));
        match args.format {
            CurveFormat::Csv => export_curve_csv(&path, curve)?,
            CurveFormat::Frd => export_curve_frd(&path, curve)?,
        }
        if !args.json {
            println!("{coil}: {} points saved to {}", curve.len(), path.display());
        }
    }

    if args.json {
        let report: Vec<_> = curves
            .iter()
            .map(|(coil, curve)| CurveReport::new(coil, curve))
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
