//! Time utilities for marionette
//!
//! Provides the injectable [`Clock`] capability used by schedule due-checks,
//! plus time-of-day and weekday-set types shared by schedule configuration.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `MARIONETTE_MOCK_TIME` environment variable can be set
//! to override the system time seen by [`SystemClock`]. This is useful for
//! checking schedule ranges and weekday filters by hand.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! MARIONETTE_MOCK_TIME="2025-12-25 14:30:00" marionette due nightly
//! ```

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::{MarionetteError, Result};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "MARIONETTE_MOCK_TIME";

/// Format accepted for mock time and command-line instants
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Initialize the mock time offset based on the environment variable.
/// Returns the offset between mock time and real time at process start.
#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_local_datetime(&mock_time_str) {
                    Ok(mock_dt) => {
                        let real_now = chrono::Local::now();
                        let offset = mock_dt.signed_duration_since(real_now);
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(e) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            error = %e,
                            "Ignoring invalid mock time"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` string as a local instant.
///
/// Ambiguous local times (DST fold) resolve to the earlier instant;
/// nonexistent ones (DST gap) are rejected.
pub fn parse_local_datetime(s: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
        .map_err(|_| MarionetteError::invalid_time(s, "YYYY-MM-DD HH:MM:SS"))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| MarionetteError::invalid_time(s, "a local time that exists"))
}

/// Format a DateTime with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Source of the current instant.
///
/// Due-checks take a clock instead of reading the system time so that
/// they stay deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock of the host, honoring `MARIONETTE_MOCK_TIME` in debug builds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        now()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self(at)
    }

    /// Returns a clock moved forward by `by`
    pub fn advanced(&self, by: chrono::Duration) -> Self {
        Self(self.0 + by)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Time of day with second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self {
                hour,
                minute,
                second,
            })
        } else {
            None
        }
    }

    /// Truncates sub-second precision; leap seconds clamp to :59.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second().min(59) as u8,
        }
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        (self.hour as u32) * 3600 + (self.minute as u32) * 60 + self.second as u32
    }
}

impl PartialOrd for TimeOfDay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeOfDay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_seconds_from_midnight()
            .cmp(&other.as_seconds_from_midnight())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Set of days of the week, bit `n` is `n` days from Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const NONE: DaysOfWeek = DaysOfWeek(0);

    fn bit(weekday: Weekday) -> u8 {
        1 << weekday.num_days_from_sunday()
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= Self::bit(weekday);
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.0 & Self::bit(weekday)) != 0
    }

    /// Days in the set, Sunday first
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ]
        .into_iter()
        .filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for DaysOfWeek {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut days = Self::NONE;
        for day in iter {
            days.insert(day);
        }
        days
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_time_of_day_ordering() {
        let morning = TimeOfDay::new(8, 0, 0).unwrap();
        let just_after = TimeOfDay::new(8, 0, 1).unwrap();
        let evening = TimeOfDay::new(18, 30, 0).unwrap();

        assert!(TimeOfDay::new(0, 0, 0).unwrap() < morning);
        assert!(morning < just_after);
        assert!(just_after < evening);
    }

    #[test]
    fn test_time_of_day_bounds() {
        assert!(TimeOfDay::new(23, 59, 59).is_some());
        assert!(TimeOfDay::new(24, 0, 0).is_none());
        assert!(TimeOfDay::new(12, 60, 0).is_none());
        assert!(TimeOfDay::new(12, 0, 60).is_none());
    }

    #[test]
    fn test_time_of_day_from_naive_time() {
        let naive = NaiveTime::from_hms_milli_opt(10, 59, 50, 750).unwrap();
        let t = TimeOfDay::from_naive_time(naive);
        assert_eq!(t, TimeOfDay::new(10, 59, 50).unwrap());
        assert_eq!(t.to_string(), "10:59:50");
    }

    #[test]
    fn test_days_of_week() {
        let mut days = DaysOfWeek::NONE;
        assert!(!days.contains(Weekday::Mon));

        days.insert(Weekday::Mon);
        days.insert(Weekday::Sat);
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Sat));
        assert!(!days.contains(Weekday::Sun));
        assert!(!days.contains(Weekday::Fri));
    }

    #[test]
    fn test_days_of_week_collect() {
        let days: DaysOfWeek = [Weekday::Sun, Weekday::Mon].into_iter().collect();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![Weekday::Sun, Weekday::Mon]);
        assert_eq!(days.to_string(), "Sun, Mon");
        assert_eq!(DaysOfWeek::NONE.iter().count(), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
        assert_eq!(format_duration(Duration::from_secs(90000)), "1d 1h 0m");
    }

    #[test]
    fn test_fixed_clock() {
        let at = Local.with_ymd_and_hms(2011, 5, 23, 11, 0, 0).unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), clock.now());

        let later = clock.advanced(chrono::Duration::hours(1));
        assert_eq!(later.now(), at + chrono::Duration::hours(1));
    }

    #[test]
    fn test_system_clock_returns_time() {
        let t = SystemClock.now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_parse_local_datetime() {
        let dt = parse_local_datetime("2025-12-25 14:30:00").unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:00");
    }

    #[test]
    fn test_parse_local_datetime_invalid_formats() {
        let invalid_formats = [
            "2025-12-25",
            "14:30:00",
            "2025/12/25 14:30:00",
            "2025-12-25T14:30:00",
            "",
            "not a date",
        ];

        for format_str in &invalid_formats {
            let result = parse_local_datetime(format_str);
            assert!(
                matches!(result, Err(MarionetteError::InvalidTime { .. })),
                "Expected '{}' to fail parsing, got {:?}",
                format_str,
                result
            );
        }
    }

    #[test]
    fn test_mock_time_env_var_name() {
        assert_eq!(MOCK_TIME_ENV_VAR, "MARIONETTE_MOCK_TIME");
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_is_mock_time_active_in_debug() {
        // OnceLock caches the first read, so only check that it doesn't panic
        let _ = is_mock_time_active();
    }
}
