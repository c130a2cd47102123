//! Shared utilities for marionette
//!
//! This crate provides:
//! - Name types (ScheduleName)
//! - Time utilities (injectable clocks, time of day, weekday sets)
//! - Error types
//! - Default paths for configuration

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
