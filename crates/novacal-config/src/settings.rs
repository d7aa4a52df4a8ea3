//! Engine settings shared by the FIR and calibration workflows.

use std::path::{Path, PathBuf};

use novacal_core::{
    DEFAULT_PEAK_THRESHOLD, DEFAULT_REGULARIZATION, DEFAULT_SAMPLE_RATE, DEFAULT_STACK_SAMPLES,
    FirDesigner, FirPipeline, SpectralCalibrator, WaveformStacker,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Numeric knobs of the engine.
///
/// Every field has a default, so a settings file only needs the values it
/// changes:
///
/// ```toml
/// sample_rate = 48000.0
/// n_samples = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Acquisition sample rate for calibration captures (Hz).
    pub sample_rate: f64,
    /// Length of a stacked waveform and of the FIR filter.
    pub n_samples: usize,
    /// Tikhonov factor relative to the mean diagonal of the normal matrix.
    pub regularization: f64,
    /// Harmonic detection threshold relative to the strongest tx bin.
    pub peak_threshold: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_samples: DEFAULT_STACK_SAMPLES,
            regularization: DEFAULT_REGULARIZATION,
            peak_threshold: DEFAULT_PEAK_THRESHOLD,
        }
    }
}

impl EngineSettings {
    /// Load and validate settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), ?settings, "settings loaded");
        Ok(settings)
    }

    /// Settings from `explicit` if given, else from the user settings file
    /// if it exists, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback: PathBuf = paths::default_settings_path();
        if fallback.is_file() {
            return Self::load(fallback);
        }
        Ok(Self::default())
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::invalid(
                "sample_rate",
                format!("must be positive and finite, got {}", self.sample_rate),
            ));
        }
        if self.n_samples == 0 {
            return Err(ConfigError::invalid("n_samples", "must be at least 1"));
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(ConfigError::invalid(
                "regularization",
                format!("must be finite and non-negative, got {}", self.regularization),
            ));
        }
        if !(self.peak_threshold.is_finite() && (0.0..1.0).contains(&self.peak_threshold)) {
            return Err(ConfigError::invalid(
                "peak_threshold",
                format!("must lie in [0, 1), got {}", self.peak_threshold),
            ));
        }
        Ok(())
    }

    /// Waveform stacker producing `n_samples` points.
    pub fn stacker(&self) -> Result<WaveformStacker, ConfigError> {
        Ok(WaveformStacker::new(self.n_samples)?)
    }

    /// FIR designer with the configured damping.
    pub fn designer(&self) -> Result<FirDesigner, ConfigError> {
        Ok(FirDesigner::new(self.regularization)?)
    }

    /// Stacker and designer combined.
    pub fn pipeline(&self) -> Result<FirPipeline, ConfigError> {
        Ok(FirPipeline::new(self.stacker()?, self.designer()?))
    }

    /// Spectral calibrator at the configured sample rate and threshold.
    pub fn calibrator(&self) -> Result<SpectralCalibrator, ConfigError> {
        Ok(SpectralCalibrator::new(self.sample_rate)?.with_peak_threshold(self.peak_threshold)?)
    }
}
