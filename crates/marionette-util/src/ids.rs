//! Strongly-typed names for marionette

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique name of a schedule resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleName(String);

impl ScheduleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ScheduleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScheduleName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for ScheduleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_name_equality() {
        let a = ScheduleName::new("daily");
        let b = ScheduleName::from("daily");
        let c = ScheduleName::new("weekly");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn schedule_name_serializes_as_plain_string() {
        let name = ScheduleName::new("maintenance");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"maintenance\"");

        let parsed: ScheduleName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }
}
