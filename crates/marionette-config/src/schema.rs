//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schedule::{Period, PeriodMatch, ScheduleAttributes};

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Evaluation settings
    #[serde(default)]
    pub settings: RawSettings,

    /// User-defined schedules
    #[serde(default)]
    pub schedules: Vec<RawSchedule>,
}

/// Global settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSettings {
    /// Treat every schedule as due
    #[serde(default)]
    pub ignore_schedules: bool,

    /// Register the built-in schedules before user definitions
    #[serde(default = "default_true")]
    pub default_schedules: bool,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            ignore_schedules: false,
            default_schedules: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Raw schedule definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Unique name; replaces a built-in schedule of the same name
    pub name: String,

    pub period: Option<Period>,

    pub periodmatch: Option<PeriodMatch>,

    /// Runs allowed per period (distance matching only)
    pub repeat: Option<u32>,

    /// Time-of-day windows, e.g. "2:00 - 4:00"
    pub range: Option<RawValues>,

    /// Day names or numbers, 0 = Sunday
    pub weekday: Option<RawValues>,
}

impl RawSchedule {
    /// Attributes for [`crate::Schedule::new`], with defaults filled in
    pub fn attributes(&self) -> ScheduleAttributes {
        ScheduleAttributes {
            period: self.period,
            periodmatch: self.periodmatch.unwrap_or_default(),
            range: RawValues::tokens(self.range.as_ref()),
            repeat: self.repeat.unwrap_or(1),
            weekday: RawValues::tokens(self.weekday.as_ref()),
        }
    }
}

/// A single value or a list of them
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawValues {
    One(RawToken),
    Many(Vec<RawToken>),
}

impl RawValues {
    fn tokens(values: Option<&RawValues>) -> Vec<String> {
        match values {
            None => Vec::new(),
            Some(RawValues::One(token)) => vec![token.to_string()],
            Some(RawValues::Many(tokens)) => tokens.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Weekdays may be written as bare numbers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawToken {
    Text(String),
    Number(i64),
}

impl fmt::Display for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawToken::Text(s) => f.write_str(s),
            RawToken::Number(n) => write!(f, "{}", n),
        }
    }
}
