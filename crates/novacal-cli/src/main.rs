//! Novacal CLI - FIR correction and transfer-function calibration for induction coils.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "novacal")]
#[command(author, version, about = "Induction-coil calibration toolkit", long_about = None)]
struct Cli {
    /// Engine settings file (TOML); defaults to the user config directory
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Design FIR correction filters from station square-wave captures
    Fir(commands::fir::FirArgs),

    /// Run a concurrent transfer-function calibration plan
    Calibrate(commands::calibrate::CalibrateArgs),

    /// Summarize a window of one or more capture files
    Inspect(commands::inspect::InspectArgs),

    /// Show a station folder's config.csv
    Station(commands::station::StationArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings.as_deref();

    match cli.command {
        Commands::Fir(args) => commands::fir::run(args, settings),
        Commands::Calibrate(args) => commands::calibrate::run(args, settings),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Station(args) => commands::station::run(args),
    }
}
