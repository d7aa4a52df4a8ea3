//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/novacal/`
//! - macOS: `~/Library/Application Support/novacal/`
//! - Windows: `%APPDATA%\novacal\`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "novacal";

/// File name of the user engine settings.
const SETTINGS_FILE: &str = "settings.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Location searched for engine settings when none is given explicitly.
pub fn default_settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}
