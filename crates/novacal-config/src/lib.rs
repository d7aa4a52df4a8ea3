//! Configuration for the Novacal calibration engine.
//!
//! This crate provides:
//!
//! - [`EngineSettings`]: sample rate, stack length, damping and peak
//!   threshold, stored as TOML
//! - [`CalibrationPlan`] and [`FirPlan`]: TOML run plans that turn into core
//!   requests and jobs
//! - [`StationConfig`]: the `config.csv` file found in station folders
//! - [`paths`]: platform configuration directories
//!
//! # Example
//!
//! ```rust,ignore
//! use novacal_config::{CalibrationPlan, EngineSettings};
//!
//! let settings = EngineSettings::discover(None)?;
//! let request = CalibrationPlan::load("plan.toml")?.to_request()?;
//! let run = novacal_core::CalibrationRun::new(request, settings.calibrator()?);
//! ```

mod error;
pub mod paths;
mod plan;
mod settings;
mod station;

pub use error::ConfigError;
pub use plan::{CalibrationPlan, FirPlan, PlanJob, PlanTask};
pub use settings::EngineSettings;
pub use station::{STATION_FILE_NAME, StationConfig};
