//! Capture inspection command.

use std::path::PathBuf;

use clap::Args;
use novacal_io::{read_and_downsample, total_length};

#[derive(Args)]
pub struct InspectArgs {
    /// Capture files, concatenated in order
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// First sample of the window in every file
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// End of the window (exclusive); defaults to the end of each file
    #[arg(long)]
    end: Option<usize>,

    /// Keep first/min/max/last of every run of this many points
    #[arg(long, default_value_t = 1)]
    decimation: usize,

    /// Print every (time, value) point of the view
    #[arg(long)]
    points: bool,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let total = total_length(&args.files)?;
    let view = read_and_downsample(&args.files, args.start, args.end, args.decimation)?;

    println!("Files:        {}", args.files.len());
    println!("Total length: {total} samples");
    println!("View points:  {}", view.len());

    if !view.is_empty() {
        let min = view.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = view.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = view.values.iter().sum::<f64>() / view.len() as f64;
        println!("Min:          {min:.6}");
        println!("Max:          {max:.6}");
        println!("Mean:         {mean:.6}");
    }

    if args.points {
        println!("time,value");
        for (t, v) in view.times.iter().zip(&view.values) {
            println!("{t},{v}");
        }
    }
    Ok(())
}
