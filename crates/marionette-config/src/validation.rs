//! Configuration validation

use chrono::Weekday;
use marionette_util::{DaysOfWeek, TimeOfDay};
use std::collections::HashSet;
use thiserror::Error;

use crate::schedule::{Schedule, ScheduleError, TimeRange};
use crate::schema::RawConfig;

/// Validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Schedule '{name}': {source}")]
    ScheduleError {
        name: String,
        #[source]
        source: ScheduleError,
    },

    #[error("Duplicate schedule name: {0}")]
    DuplicateScheduleName(String),

    #[error("Schedule name cannot be empty")]
    EmptyScheduleName,
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    build_schedules(config).1
}

/// Build every user schedule, collecting all errors rather than stopping at
/// the first.
pub(crate) fn build_schedules(config: &RawConfig) -> (Vec<Schedule>, Vec<ValidationError>) {
    let mut schedules = Vec::new();
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for raw in &config.schedules {
        if raw.name.trim().is_empty() {
            errors.push(ValidationError::EmptyScheduleName);
            continue;
        }
        if !seen.insert(raw.name.as_str()) {
            errors.push(ValidationError::DuplicateScheduleName(raw.name.clone()));
            continue;
        }

        match Schedule::new(raw.name.as_str(), raw.attributes()) {
            Ok(schedule) => schedules.push(schedule),
            Err(source) => errors.push(ValidationError::ScheduleError {
                name: raw.name.clone(),
                source,
            }),
        }
    }

    (schedules, errors)
}

/// Parse a weekday token: a digit 0-6 (0 = Sunday) or a day name.
///
/// Names are case-insensitive: the full English name or one of the
/// abbreviations `Sun`, `Mon`, `Tue`, `Tues`, `Wed`, `Thu`, `Thurs`, `Fri`,
/// `Sat`.
pub fn parse_weekday(token: &str) -> Result<Weekday, ScheduleError> {
    let trimmed = token.trim();
    let invalid = || ScheduleError::InvalidWeekday(token.to_string());

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return match trimmed {
            "0" => Ok(Weekday::Sun),
            "1" => Ok(Weekday::Mon),
            "2" => Ok(Weekday::Tue),
            "3" => Ok(Weekday::Wed),
            "4" => Ok(Weekday::Thu),
            "5" => Ok(Weekday::Fri),
            "6" => Ok(Weekday::Sat),
            _ => Err(invalid()),
        };
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "sun" | "sunday" => Ok(Weekday::Sun),
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thurs" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        _ => Err(invalid()),
    }
}

/// Parse a list of weekday tokens into a set
pub fn parse_weekdays<S: AsRef<str>>(tokens: &[S]) -> Result<DaysOfWeek, ScheduleError> {
    tokens.iter().map(|t| parse_weekday(t.as_ref())).collect()
}

/// Parse `H[:M[:S]]`; missing components are zero.
pub fn parse_time_of_day(s: &str) -> Result<TimeOfDay, String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() > 3 {
        return Err(format!("'{}' has too many components", s.trim()));
    }

    let mut values = [0u8; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("'{}' is not a time of day", s.trim()));
        }
        *slot = part
            .parse()
            .map_err(|_| format!("'{}' is out of range", part))?;
    }

    let [hour, minute, second] = values;
    if hour >= 24 {
        return Err(format!("hour {} must be 0-23", hour));
    }
    if minute >= 60 {
        return Err(format!("minute {} must be 0-59", minute));
    }
    if second >= 60 {
        return Err(format!("second {} must be 0-59", second));
    }

    TimeOfDay::new(hour, minute, second).ok_or_else(|| format!("'{}' is not a time of day", s))
}

/// Parse `H[:M[:S]] - H[:M[:S]]` into an inclusive window.
///
/// The start may equal the end. A start after the end is rejected; windows
/// do not wrap past midnight.
pub fn parse_range(s: &str) -> Result<TimeRange, ScheduleError> {
    let invalid = |message: String| ScheduleError::InvalidRange {
        value: s.to_string(),
        message,
    };

    let Some((start, end)) = s.split_once('-') else {
        return Err(invalid("expected 'start - end'".into()));
    };

    let start = parse_time_of_day(start).map_err(invalid)?;
    let end = parse_time_of_day(end).map_err(invalid)?;

    if start > end {
        return Err(ScheduleError::InvertedRange {
            value: s.to_string(),
            start,
            end,
        });
    }

    Ok(TimeRange { start, end })
}
