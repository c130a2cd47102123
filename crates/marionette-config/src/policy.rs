//! Validated schedule book

use chrono::{DateTime, Local};
use marionette_util::{Clock, MarionetteError, Result, ScheduleName};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::schedule::Schedule;
use crate::schema::{RawConfig, RawSettings};
use crate::validation::{ValidationError, build_schedules};

/// Global evaluation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Every known schedule is due, whatever its filters say
    pub ignore_schedules: bool,
    /// Built-in schedules are registered
    pub default_schedules: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_schedules: false,
            default_schedules: true,
        }
    }
}

impl From<&RawSettings> for Settings {
    fn from(raw: &RawSettings) -> Self {
        Self {
            ignore_schedules: raw.ignore_schedules,
            default_schedules: raw.default_schedules,
        }
    }
}

/// Named schedules ready for due-checks
#[derive(Debug, Clone)]
pub struct ScheduleBook {
    settings: Settings,
    schedules: BTreeMap<ScheduleName, Schedule>,
}

impl ScheduleBook {
    /// Empty book, seeded with the built-in schedules when enabled
    pub fn new(settings: Settings) -> Self {
        let mut book = Self {
            settings,
            schedules: BTreeMap::new(),
        };

        if settings.default_schedules {
            for schedule in Schedule::defaults() {
                book.schedules.insert(schedule.name().clone(), schedule);
            }
        }

        book
    }

    /// Convert from raw config. All schedule errors are reported together.
    pub fn from_raw(raw: &RawConfig) -> std::result::Result<Self, Vec<ValidationError>> {
        let (schedules, errors) = build_schedules(raw);
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut book = Self::new(Settings::from(&raw.settings));
        for schedule in schedules {
            book.insert(schedule);
        }

        info!(
            schedules = book.schedules.len(),
            ignore_schedules = book.settings.ignore_schedules,
            "Schedule book loaded"
        );

        Ok(book)
    }

    /// Register a schedule, replacing any existing one with the same name
    pub fn insert(&mut self, schedule: Schedule) -> Option<Schedule> {
        let name = schedule.name().clone();
        let replaced = self.schedules.insert(name.clone(), schedule);
        if replaced.is_some() {
            info!(schedule = %name, "Schedule definition replaced");
        } else {
            debug!(schedule = %name, "Schedule registered");
        }
        replaced
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn get(&self, name: &str) -> Option<&Schedule> {
        self.schedules.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &ScheduleName> {
        self.schedules.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schedule> {
        self.schedules.values()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Whether work under schedule `name`, last run at `previous`, is due
    /// now. Work that has never run is treated as last run at the epoch.
    pub fn is_due(
        &self,
        name: &str,
        previous: Option<DateTime<Local>>,
        clock: &dyn Clock,
    ) -> Result<bool> {
        let schedule = self
            .get(name)
            .ok_or_else(|| MarionetteError::ScheduleNotFound(ScheduleName::new(name)))?;

        if self.settings.ignore_schedules {
            debug!(schedule = %name, "Schedules ignored; treating as due");
            return Ok(true);
        }

        Ok(schedule.matches(&previous.unwrap_or_default(), &clock.now()))
    }

    /// Names of every schedule due now, given the last run per schedule.
    /// The clock is read once for the whole pass.
    pub fn due_schedules(
        &self,
        previous: &HashMap<ScheduleName, DateTime<Local>>,
        clock: &dyn Clock,
    ) -> Vec<&ScheduleName> {
        let now = clock.now();

        self.schedules
            .iter()
            .filter(|(name, schedule)| {
                self.settings.ignore_schedules
                    || schedule.matches(&previous.get(*name).copied().unwrap_or_default(), &now)
            })
            .map(|(name, _)| name)
            .collect()
    }
}

impl Default for ScheduleBook {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
