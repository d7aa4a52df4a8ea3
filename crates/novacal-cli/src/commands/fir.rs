//! FIR correction command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use novacal_config::{FirPlan, STATION_FILE_NAME, StationConfig};
use novacal_core::{FirJob, FirPipeline};
use novacal_io::{BinaryFileSource, coefficient_file_name, export_coefficients_csv, write_capture};

use super::common;

#[derive(Args)]
pub struct FirArgs {
    /// FIR plan (TOML) with one [[jobs]] entry per station
    #[arg(long, value_name = "FILE", conflicts_with = "folder")]
    plan: Option<PathBuf>,

    /// Station folder holding the capture and an optional config.csv
    #[arg(long, value_name = "DIR")]
    folder: Option<PathBuf>,

    /// Coil name (overrides config.csv)
    #[arg(long)]
    coil: Option<String>,

    /// Square-wave fundamental in Hz (overrides config.csv)
    #[arg(long)]
    base_frequency: Option<f64>,

    /// Capture sample rate in Hz (overrides config.csv)
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Capture file name inside the folder (overrides config.csv)
    #[arg(long)]
    channel: Option<String>,

    /// Directory for the coefficient table; defaults to the station folder
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Also write the corrected waveform as a capture file
    #[arg(long)]
    write_filtered: bool,
}

pub fn run(args: FirArgs, settings: Option<&Path>) -> anyhow::Result<()> {
    let settings = common::load_settings(settings)?;
    let pipeline = settings.pipeline()?;
    let jobs = collect_jobs(&args)?;
    let timestamp = common::timestamp();

    let mut failures = 0;
    for (station, job) in &jobs {
        match process_job(&pipeline, station, job, &args, &timestamp) {
            Ok(path) => println!("{station}: FIR coefficients saved to {}", path.display()),
            Err(err) => {
                failures += 1;
                tracing::error!(station = %station, error = %format!("{err:#}"), "FIR job failed");
                println!("{station}: error processing FIR: {err:#}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} FIR job(s) failed", jobs.len());
    }
    Ok(())
}

fn collect_jobs(args: &FirArgs) -> anyhow::Result<Vec<(String, FirJob)>> {
    if let Some(plan_path) = &args.plan {
        let plan = FirPlan::load(plan_path)?;
        if plan.jobs.is_empty() {
            anyhow::bail!("{} lists no FIR jobs", plan_path.display());
        }
        return Ok(plan
            .jobs
            .iter()
            .map(|entry| (entry.station.clone(), entry.to_job()))
            .collect());
    }

    let Some(folder) = &args.folder else {
        anyhow::bail!("either --plan or --folder is required");
    };
    let explicit = StationConfig {
        coil_name: args.coil.clone(),
        base_frequency: args.base_frequency,
        sample_rate: args.sample_rate,
        coil_channel: args.channel.clone(),
    };
    let station_file = folder.join(STATION_FILE_NAME);
    let merged = if station_file.is_file() {
        explicit.or(StationConfig::load(&station_file)?)
    } else {
        explicit
    };
    let job = merged
        .into_job(folder)
        .with_context(|| format!("no {STATION_FILE_NAME} value to fall back on in {}", folder.display()))?;
    Ok(vec![(folder.display().to_string(), job)])
}

fn process_job(
    pipeline: &FirPipeline,
    station: &str,
    job: &FirJob,
    args: &FirArgs,
    timestamp: &str,
) -> anyhow::Result<PathBuf> {
    let pb = common::percent_bar(station);
    let outcome = pipeline.run(job, &BinaryFileSource, &|p: u8| pb.set_position(u64::from(p)));
    pb.finish_and_clear();
    let outcome = outcome?;

    let out_dir = args.output.clone().unwrap_or_else(|| job.folder.clone());
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let path = out_dir.join(coefficient_file_name(&job.coil_name, timestamp));
    export_coefficients_csv(&path, &outcome.coefficients)?;

    if args.write_filtered {
        let filtered = out_dir.join(format!("filtered_signal_{}_{timestamp}.bin", job.coil_name));
        write_capture(&filtered, &outcome.filtered)?;
        println!("{station}: filtered waveform saved to {}", filtered.display());
    }

    tracing::info!(
        station,
        coil = %job.coil_name,
        residual_rms = outcome.residual_rms(),
        "FIR correction written"
    );
    Ok(path)
}
