//! Default paths for marionette components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/marionette/schedules.toml` or `~/.config/marionette/schedules.toml`

use std::path::PathBuf;

/// Environment variable for overriding the configuration file path
pub const MARIONETTE_CONFIG_ENV: &str = "MARIONETTE_CONFIG";

/// Configuration filename within the config directory
const CONFIG_FILENAME: &str = "schedules.toml";

/// Application subdirectory name
const APP_DIR: &str = "marionette";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$MARIONETTE_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/marionette/schedules.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/marionette/schedules.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(MARIONETTE_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking MARIONETTE_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

/// Get the directory holding the configuration file
pub fn config_dir() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/etc").join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_marionette() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("marionette"));
        assert!(path.to_string_lossy().ends_with("schedules.toml"));
    }

    #[test]
    fn config_dir_is_parent_of_config_path() {
        let path = config_path_without_env();
        assert_eq!(path.parent().unwrap(), config_dir());
    }
}
