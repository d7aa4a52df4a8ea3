//! TOML run plans for calibration and FIR batches.
//!
//! A calibration plan lists one `[[tasks]]` table per capture pair:
//!
//! ```toml
//! [[tasks]]
//! coil = "HX"
//! station = "north"
//! frequency = 128.0
//! waveform = "Square"
//! tx = "north/tx_128.bin"
//! rx = "north/hx_128.bin"
//! ```
//!
//! A FIR plan lists one `[[jobs]]` table per station capture. Relative paths
//! in either plan are resolved against the directory holding the plan file.

use std::path::{Path, PathBuf};

use novacal_core::{CalibrationRequest, CalibrationTask, FirJob, Waveform};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn read_plan(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))
}

fn rebase(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn plan_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// One calibration unit as written in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    /// Coil under test.
    pub coil: String,
    /// Station label, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
    /// Stimulus frequency in Hz.
    pub frequency: f64,
    /// `"Sine"` or `"Square"`.
    pub waveform: String,
    /// Transmit capture.
    pub tx: PathBuf,
    /// Receive capture.
    pub rx: PathBuf,
}

/// A calibration request in TOML form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPlan {
    /// Units to calibrate.
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
}

impl CalibrationPlan {
    /// Load a plan, resolving relative capture paths against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut plan = Self::from_toml(&read_plan(path)?)?;
        plan.resolve_paths(plan_dir(path));
        tracing::debug!(path = %path.display(), tasks = plan.tasks.len(), "calibration plan loaded");
        Ok(plan)
    }

    /// Parse a plan from a TOML string, leaving paths untouched.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the plan to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Prefix every relative capture path with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for task in &mut self.tasks {
            rebase(base, &mut task.tx);
            rebase(base, &mut task.rx);
        }
    }

    /// Build the core request, checking waveform names and frequencies.
    pub fn to_request(&self) -> Result<CalibrationRequest, ConfigError> {
        let mut request = CalibrationRequest::default();
        for (i, task) in self.tasks.iter().enumerate() {
            let waveform: Waveform = task
                .waveform
                .parse()
                .map_err(|e: novacal_core::Error| ConfigError::invalid(format!("tasks[{i}].waveform"), e.to_string()))?;
            if !(task.frequency.is_finite() && task.frequency > 0.0) {
                return Err(ConfigError::invalid(
                    format!("tasks[{i}].frequency"),
                    format!("must be positive and finite, got {}", task.frequency),
                ));
            }
            request.push(CalibrationTask::new(
                &task.coil,
                task.frequency,
                waveform,
                &task.tx,
                &task.rx,
            ));
        }
        if request.len() < self.tasks.len() {
            tracing::warn!(
                listed = self.tasks.len(),
                unique = request.len(),
                "duplicate plan entries collapsed"
            );
        }
        Ok(request)
    }
}

/// One FIR computation as written in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanJob {
    /// Station label used in log and report lines.
    pub station: String,
    /// Folder holding the capture and receiving the coefficient table.
    pub folder: PathBuf,
    /// Coil identifier.
    pub coil_name: String,
    /// Square-wave fundamental (Hz).
    pub base_frequency: f64,
    /// Capture sample rate (Hz).
    pub sample_rate: f64,
    /// Capture file name inside `folder`.
    pub coil_channel: String,
}

impl PlanJob {
    /// Core job for this entry.
    pub fn to_job(&self) -> FirJob {
        FirJob {
            coil_name: self.coil_name.clone(),
            base_frequency: self.base_frequency,
            sample_rate: self.sample_rate,
            channel: self.coil_channel.clone(),
            folder: self.folder.clone(),
        }
    }
}

/// A batch of FIR jobs, run one after another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirPlan {
    /// Jobs in execution order.
    #[serde(default)]
    pub jobs: Vec<PlanJob>,
}

impl FirPlan {
    /// Load a plan, resolving relative folders against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut plan = Self::from_toml(&read_plan(path)?)?;
        let base = plan_dir(path);
        for job in &mut plan.jobs {
            rebase(base, &mut job.folder);
        }
        tracing::debug!(path = %path.display(), jobs = plan.jobs.len(), "FIR plan loaded");
        Ok(plan)
    }

    /// Parse a plan from a TOML string, leaving paths untouched.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }
}
