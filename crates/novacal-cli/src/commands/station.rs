//! Station folder inspection.

use std::fmt::Display;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use novacal_config::StationConfig;

#[derive(Args)]
pub struct StationArgs {
    /// Station folder containing config.csv
    #[arg(value_name = "DIR")]
    folder: PathBuf,
}

fn show<T: Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "(unset)".to_owned(), ToString::to_string)
}

pub fn run(args: StationArgs) -> anyhow::Result<()> {
    let station = StationConfig::load_from_folder(&args.folder)
        .with_context(|| format!("reading station {}", args.folder.display()))?;

    println!("Station:        {}", args.folder.display());
    println!("Coil name:      {}", show(station.coil_name.as_ref()));
    println!("Base frequency: {}", show(station.base_frequency.as_ref()));
    println!("Sample rate:    {}", show(station.sample_rate.as_ref()));
    println!("Coil channel:   {}", show(station.coil_channel.as_ref()));
    Ok(())
}
