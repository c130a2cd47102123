//! Schedules and the due-check predicate

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike};
use marionette_util::{DaysOfWeek, ScheduleName, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::validation::{parse_range, parse_weekdays};

/// Rejected schedule attributes. Raised when the schedule is built, never
/// when it is matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("'{0}' is not a valid day of the week")]
    InvalidWeekday(String),

    #[error("Invalid range '{value}': {message}")]
    InvalidRange { value: String, message: String },

    #[error("Range '{value}' starts at {start}, after its end at {end}")]
    InvertedRange {
        value: String,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("Repeat must be at least 1")]
    ZeroRepeat,

    #[error("Repeat {0} requires periodmatch 'distance'")]
    RepeatWithNumberMatch(u32),
}

/// Nominal recurrence unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Hourly,
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Never,
    ];

    /// Length used by distance matching; monthly is a nominal 30 days.
    pub fn seconds(self) -> Option<i64> {
        match self {
            Period::Hourly => Some(3600),
            Period::Daily => Some(86400),
            Period::Weekly => Some(604800),
            Period::Monthly => Some(2592000),
            Period::Never => None,
        }
    }

    /// Start of the period bucket containing `dt`. Weeks start on Sunday.
    fn bucket_start(self, dt: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = dt.date();
        match self {
            Period::Hourly => date.and_hms_opt(dt.hour(), 0, 0),
            Period::Daily => date.and_hms_opt(0, 0, 0),
            Period::Weekly => date
                .checked_sub_signed(chrono::Duration::days(
                    date.weekday().num_days_from_sunday().into(),
                ))?
                .and_hms_opt(0, 0, 0),
            Period::Monthly => date.with_day(1)?.and_hms_opt(0, 0, 0),
            Period::Never => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Hourly => "hourly",
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Never => "never",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How due-ness within a period is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMatch {
    /// Enough wall-clock time has elapsed since the previous run
    #[default]
    Distance,
    /// The previous run falls in a different calendar bucket
    Number,
}

impl fmt::Display for PeriodMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodMatch::Distance => f.write_str("distance"),
            PeriodMatch::Number => f.write_str("number"),
        }
    }
}

/// Inclusive time-of-day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Unvalidated schedule attributes as set by a resource declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAttributes {
    pub period: Option<Period>,
    pub periodmatch: PeriodMatch,
    pub range: Vec<String>,
    pub repeat: u32,
    pub weekday: Vec<String>,
}

impl Default for ScheduleAttributes {
    fn default() -> Self {
        Self {
            period: None,
            periodmatch: PeriodMatch::Distance,
            range: Vec::new(),
            repeat: 1,
            weekday: Vec::new(),
        }
    }
}

impl ScheduleAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn periodmatch(mut self, periodmatch: PeriodMatch) -> Self {
        self.periodmatch = periodmatch;
        self
    }

    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range.push(range.into());
        self
    }

    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn weekday(mut self, weekday: impl Into<String>) -> Self {
        self.weekday.push(weekday.into());
        self
    }
}

/// Outcome of each filter for one due-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchReport {
    pub period: bool,
    pub range: bool,
    pub weekday: bool,
}

impl MatchReport {
    pub fn is_match(&self) -> bool {
        self.period && self.range && self.weekday
    }
}

/// A validated, immutable schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    name: ScheduleName,
    period: Option<Period>,
    periodmatch: PeriodMatch,
    ranges: Vec<TimeRange>,
    repeat: u32,
    weekdays: Option<DaysOfWeek>,
}

impl Schedule {
    /// Validate `attributes` into a schedule named `name`
    pub fn new(
        name: impl Into<ScheduleName>,
        attributes: ScheduleAttributes,
    ) -> Result<Self, ScheduleError> {
        if attributes.repeat == 0 {
            return Err(ScheduleError::ZeroRepeat);
        }
        if attributes.repeat > 1 && attributes.periodmatch == PeriodMatch::Number {
            return Err(ScheduleError::RepeatWithNumberMatch(attributes.repeat));
        }

        let ranges = attributes
            .range
            .iter()
            .map(|r| parse_range(r))
            .collect::<Result<Vec<_>, _>>()?;

        let weekdays = if attributes.weekday.is_empty() {
            None
        } else {
            Some(parse_weekdays(attributes.weekday.as_slice())?)
        };

        Ok(Self {
            name: name.into(),
            period: attributes.period,
            periodmatch: attributes.periodmatch,
            ranges,
            repeat: attributes.repeat,
            weekdays,
        })
    }

    /// Schedule with default attributes; it always matches
    pub fn unrestricted(name: impl Into<ScheduleName>) -> Self {
        Self {
            name: name.into(),
            period: None,
            periodmatch: PeriodMatch::Distance,
            ranges: Vec::new(),
            repeat: 1,
            weekdays: None,
        }
    }

    /// Built-in schedules: one per period, named after it, plus `puppet`
    /// (hourly, twice per period).
    pub fn defaults() -> Vec<Schedule> {
        let mut schedules: Vec<Schedule> = Period::ALL
            .iter()
            .map(|period| Schedule {
                period: Some(*period),
                ..Schedule::unrestricted(period.as_str())
            })
            .collect();

        schedules.push(Schedule {
            period: Some(Period::Hourly),
            repeat: 2,
            ..Schedule::unrestricted("puppet")
        });

        schedules
    }

    pub fn name(&self) -> &ScheduleName {
        &self.name
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn periodmatch(&self) -> PeriodMatch {
        self.periodmatch
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn weekdays(&self) -> Option<DaysOfWeek> {
        self.weekdays
    }

    /// Whether a resource last run at `previous` is due at `now`.
    pub fn matches<Tz: TimeZone>(&self, previous: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
        self.explain(previous, now).is_match()
    }

    /// Evaluate every filter separately.
    pub fn explain<Tz: TimeZone>(&self, previous: &DateTime<Tz>, now: &DateTime<Tz>) -> MatchReport {
        let report = MatchReport {
            period: self.period_matches(previous, now),
            range: self.range_matches(now),
            weekday: self.weekday_matches(now),
        };

        debug!(
            schedule = %self.name,
            period = report.period,
            range = report.range,
            weekday = report.weekday,
            "Schedule filters evaluated"
        );

        report
    }

    fn period_matches<Tz: TimeZone>(&self, previous: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
        let Some(period) = self.period else {
            return true;
        };
        let Some(length) = period.seconds() else {
            return false;
        };

        match self.periodmatch {
            PeriodMatch::Distance => {
                let elapsed = now.timestamp() - previous.timestamp();
                elapsed >= length / i64::from(self.repeat)
            }
            PeriodMatch::Number => {
                let previous = previous.with_timezone(&now.timezone()).naive_local();
                period.bucket_start(previous) != period.bucket_start(now.naive_local())
            }
        }
    }

    fn range_matches<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        if self.ranges.is_empty() {
            return true;
        }
        let time = TimeOfDay::from_naive_time(now.naive_local().time());
        self.ranges.iter().any(|range| range.contains(time))
    }

    fn weekday_matches<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match self.weekdays {
            Some(days) => days.contains(now.naive_local().weekday()),
            None => true,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        match self.period {
            Some(period) => write!(f, " period={} ({})", period, self.periodmatch)?,
            None => write!(f, " period=any")?,
        }
        if self.repeat > 1 {
            write!(f, " repeat={}", self.repeat)?;
        }
        if !self.ranges.is_empty() {
            let ranges: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
            write!(f, " range=[{}]", ranges.join(", "))?;
        }
        if let Some(days) = self.weekdays {
            write!(f, " weekday=[{}]", days)?;
        }
        Ok(())
    }
}
