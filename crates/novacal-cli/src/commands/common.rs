//! Helpers shared by the commands.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use novacal_config::EngineSettings;

/// Settings from `--settings`, the user config directory, or defaults.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<EngineSettings> {
    let settings = EngineSettings::discover(explicit).context("loading engine settings")?;
    tracing::debug!(?settings, "engine settings");
    Ok(settings)
}

/// Seconds since the Unix epoch, used to stamp output files.
pub fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// A 0-100 percentage bar labelled with `label`.
pub fn percent_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{prefix:>12} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}%")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_prefix(label.to_owned());
    pb
}
