//! Schedule configuration for marionette
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Named schedules (period, matching mode, repeat, time ranges, weekdays)
//! - Built-in schedules that user definitions may replace
//! - Validation that reports every error at once

mod policy;
mod schedule;
mod schema;
mod validation;

pub use policy::*;
pub use schedule::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.errors))]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ScheduleBook> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading schedule configuration");
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<ScheduleBook> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    ScheduleBook::from_raw(&raw).map_err(|errors| ConfigError::ValidationFailed { errors })
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;
