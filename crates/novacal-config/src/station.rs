//! Station `config.csv` files.
//!
//! A station folder may carry a two-line CSV describing its coil capture:
//!
//! ```text
//! CoilName,BaseFrequency,SampleRate,CoilChannel
//! HX,10,51200,ch1.bin
//! ```
//!
//! Unknown columns are ignored and numeric cells that fail to parse are
//! skipped, leaving that value unset.

use std::path::{Path, PathBuf};

use novacal_core::FirJob;

use crate::error::ConfigError;

/// File name of the station description inside a station folder.
pub const STATION_FILE_NAME: &str = "config.csv";

/// Values read from a station `config.csv`; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationConfig {
    /// `CoilName`
    pub coil_name: Option<String>,
    /// `BaseFrequency` in Hz
    pub base_frequency: Option<f64>,
    /// `SampleRate` in Hz
    pub sample_rate: Option<f64>,
    /// `CoilChannel`, the capture file name
    pub coil_channel: Option<String>,
}

impl StationConfig {
    /// Read `config.csv` from a station folder.
    pub fn load_from_folder(folder: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(folder.as_ref().join(STATION_FILE_NAME))
    }

    /// Read a station file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::parse(&content).ok_or_else(|| ConfigError::StationFormat {
            path: path.to_path_buf(),
        })?;
        tracing::debug!(path = %path.display(), ?config, "station config read");
        Ok(config)
    }

    /// Parse the header and value rows; `None` when either row is missing.
    pub fn parse(content: &str) -> Option<Self> {
        let mut lines = content.lines();
        let headers = lines.next()?;
        let values = lines.next()?;

        let mut config = Self::default();
        for (header, value) in headers.split(',').zip(values.split(',')) {
            let value = value.trim();
            match header.trim() {
                "CoilName" if !value.is_empty() => config.coil_name = Some(value.to_owned()),
                "BaseFrequency" => config.base_frequency = value.parse().ok(),
                "SampleRate" => config.sample_rate = value.parse().ok(),
                "CoilChannel" if !value.is_empty() => config.coil_channel = Some(value.to_owned()),
                _ => {}
            }
        }
        Some(config)
    }

    /// Fill every unset value from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            coil_name: self.coil_name.or(fallback.coil_name),
            base_frequency: self.base_frequency.or(fallback.base_frequency),
            sample_rate: self.sample_rate.or(fallback.sample_rate),
            coil_channel: self.coil_channel.or(fallback.coil_channel),
        }
    }

    /// Build a FIR job for `folder`; every value must be present.
    pub fn into_job(self, folder: impl Into<PathBuf>) -> Result<FirJob, ConfigError> {
        Ok(FirJob {
            coil_name: self.coil_name.ok_or(ConfigError::MissingValue("coil name"))?,
            base_frequency: self
                .base_frequency
                .ok_or(ConfigError::MissingValue("base frequency"))?,
            sample_rate: self.sample_rate.ok_or(ConfigError::MissingValue("sample rate"))?,
            channel: self.coil_channel.ok_or(ConfigError::MissingValue("coil channel"))?,
            folder: folder.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_columns() {
        let config = StationConfig::parse(
            "CoilName,BaseFrequency,SampleRate,CoilChannel,Operator\nHX, 10.5 ,51200,ch1.bin,anna\n",
        )
        .unwrap();
        assert_eq!(config.coil_name.as_deref(), Some("HX"));
        assert_eq!(config.base_frequency, Some(10.5));
        assert_eq!(config.sample_rate, Some(51200.0));
        assert_eq!(config.coil_channel.as_deref(), Some("ch1.bin"));
    }

    #[test]
    fn bad_numbers_are_skipped() {
        let config = StationConfig::parse("CoilName,SampleRate\nHY,fast\n").unwrap();
        assert_eq!(config.coil_name.as_deref(), Some("HY"));
        assert_eq!(config.sample_rate, None);
    }

    #[test]
    fn short_value_row_stops_early() {
        let config = StationConfig::parse("CoilName,BaseFrequency,SampleRate\nHZ,8").unwrap();
        assert_eq!(config.base_frequency, Some(8.0));
        assert_eq!(config.sample_rate, None);
    }

    #[test]
    fn single_line_is_malformed() {
        assert!(StationConfig::parse("CoilName,SampleRate").is_none());
        assert!(StationConfig::parse("").is_none());
    }

    #[test]
    fn explicit_values_override_station() {
        let explicit = StationConfig {
            coil_name: Some("HX2".into()),
            ..StationConfig::default()
        };
        let station = StationConfig::parse("CoilName,BaseFrequency,SampleRate,CoilChannel\nHX,10,51200,ch1.bin").unwrap();
        let job = explicit.or(station).into_job("/st").unwrap();
        assert_eq!(job.coil_name, "HX2");
        assert_eq!(job.capture_path(), PathBuf::from("/st/ch1.bin"));
    }

    #[test]
    fn missing_value_reported() {
        let err = StationConfig::default().into_job("/st").unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue("coil name")));
    }
}
