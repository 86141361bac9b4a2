//! Shared types used across all pipeline stages.
//!
//! [`SharpnessLevel`] is produced by the rule engine, consumed by the planner,
//! and serialized into plan artifacts, so it lives here rather than in any one
//! of those modules. [`ErrorKind`] is the failure taxonomy every module-level
//! error maps onto.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordinal blur severity, from sharpest to most blurred.
///
/// The serialized names are the spellings used in rule tables
/// (`Clear`, `Slight_Blur`, `Moderate_Blur`, `Heavy_Blur`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SharpnessLevel {
    #[serde(rename = "Clear")]
    Clear,
    #[serde(rename = "Slight_Blur")]
    SlightBlur,
    #[serde(rename = "Moderate_Blur")]
    ModerateBlur,
    #[serde(rename = "Heavy_Blur")]
    HeavyBlur,
}

impl SharpnessLevel {
    /// All levels in severity order.
    pub const ALL: [SharpnessLevel; 4] = [
        SharpnessLevel::Clear,
        SharpnessLevel::SlightBlur,
        SharpnessLevel::ModerateBlur,
        SharpnessLevel::HeavyBlur,
    ];

    /// Rule-table spelling of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            SharpnessLevel::Clear => "Clear",
            SharpnessLevel::SlightBlur => "Slight_Blur",
            SharpnessLevel::ModerateBlur => "Moderate_Blur",
            SharpnessLevel::HeavyBlur => "Heavy_Blur",
        }
    }
}

impl fmt::Display for SharpnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a label does not name a known level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sharpness level '{0}'")]
pub struct UnknownLevel(pub String);

impl FromStr for SharpnessLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SharpnessLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// Failure taxonomy shared by every module error.
///
/// - `Validation`: bad binding arguments, malformed rule rows, bad config values
/// - `Config`: rule table absent or structurally unusable
/// - `Io`: image file missing or undecodable, output not writable
/// - `State`: an operation invoked before its required binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Config,
    Io,
    State,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_table_spellings() {
        assert_eq!("Clear".parse(), Ok(SharpnessLevel::Clear));
        assert_eq!("Slight_Blur".parse(), Ok(SharpnessLevel::SlightBlur));
        assert_eq!(" Moderate_Blur ".parse(), Ok(SharpnessLevel::ModerateBlur));
        assert_eq!("Heavy_Blur".parse(), Ok(SharpnessLevel::HeavyBlur));
    }

    #[test]
    fn level_rejects_unknown_label() {
        let err = "Blurry".parse::<SharpnessLevel>().unwrap_err();
        assert_eq!(err, UnknownLevel("Blurry".to_string()));
        assert_eq!(err.to_string(), "unknown sharpness level 'Blurry'");
    }

    #[test]
    fn level_serializes_as_table_spelling() {
        let json = serde_json::to_string(&SharpnessLevel::ModerateBlur).unwrap();
        assert_eq!(json, "\"Moderate_Blur\"");
    }

    #[test]
    fn levels_ordered_by_severity() {
        assert!(SharpnessLevel::Clear < SharpnessLevel::SlightBlur);
        assert!(SharpnessLevel::ModerateBlur < SharpnessLevel::HeavyBlur);
    }
}
