// crates/firmware-settings-core/src/core/settings.rs
// ============================================================================
// Module: Firmware Setting Values
// Description: Desired and reported firmware setting maps.
// Purpose: Model the int-or-string desired scalar and the string readings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Management controllers report every setting as a string. Operators may
//! write desired values as either JSON integers or strings; both render to the
//! same canonical string form for comparison and error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Setting Maps
// ============================================================================

/// Settings as last read from hardware, keyed by attribute name.
pub type SettingsMap = BTreeMap<String, String>;

/// Desired settings written by operators, keyed by attribute name.
pub type DesiredSettingsMap = BTreeMap<String, SettingValue>;

// ============================================================================
// SECTION: Setting Value
// ============================================================================

/// Desired setting scalar: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Integer-typed value.
    Integer(i64),
    /// String-typed value.
    String(String),
}

impl SettingValue {
    /// Interprets the value as an integer.
    ///
    /// Integer values are returned as-is; string values must be a base-10
    /// integer with no surrounding whitespace.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::String(value) => value.parse().ok(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => value.fmt(f),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn untagged_serde_accepts_numbers_and_strings() {
        let parsed: DesiredSettingsMap =
            serde_json::from_str(r#"{"Count": 10, "Mode": "Enabled"}"#).unwrap();
        assert_eq!(parsed.get("Count"), Some(&SettingValue::Integer(10)));
        assert_eq!(parsed.get("Mode"), Some(&SettingValue::from("Enabled")));
    }

    #[test]
    fn string_integers_parse_but_words_do_not() {
        assert_eq!(SettingValue::from("20").as_integer(), Some(20));
        assert_eq!(SettingValue::from("twenty").as_integer(), None);
        assert_eq!(SettingValue::Integer(-3).to_string(), "-3");
    }
}
