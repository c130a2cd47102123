//! Error types for marionette

use thiserror::Error;

use crate::ScheduleName;

/// Core error type for marionette operations
#[derive(Debug, Error)]
pub enum MarionetteError {
    #[error("Schedule not found: {0}")]
    ScheduleNotFound(ScheduleName),

    #[error("Invalid time '{value}': expected {expected}")]
    InvalidTime { value: String, expected: &'static str },
}

impl MarionetteError {
    pub fn invalid_time(value: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidTime {
            value: value.into(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarionetteError>;
