// crates/firmware-settings-core/src/runtime/validation.rs
// ============================================================================
// Module: Validation Engine
// Description: Type-checks desired firmware settings against a schema.
// Purpose: Reject desired values the hardware would refuse before they apply.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Every desired setting is checked independently and all violations are
//! collected. Each field yields at most one error: the first failing check in
//! the order naming policy, presence in the latest reading, read-only policy,
//! then the type rule for the attribute's declared type.
//!
//! Error `Display` strings are operator-visible and surface verbatim in the
//! `Valid` condition message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AttributeType;
use crate::core::DesiredSettingsMap;
use crate::core::SchemaMap;
use crate::core::SettingSchema;
use crate::core::SettingValue;
use crate::core::SettingsMap;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name fragment marking credential attributes that may never be set.
pub const DEFAULT_CREDENTIAL_MARKER: &str = "Password";
/// Separator used when rendering several errors into one message.
const ERROR_SEPARATOR: &str = "; ";

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Handling of desired writes to attributes the schema marks read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOnlyPolicy {
    /// Accept the write; the controller decides.
    #[default]
    Ignore,
    /// Reject the write during validation.
    Reject,
}

/// Naming and read-only policy applied on top of schema type checks.
///
/// [`DEFAULT_CREDENTIAL_MARKER`] is always enforced; `credential_markers`
/// only widens the set of reserved names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Additional attribute-name fragments that mark credential fields.
    pub credential_markers: Vec<String>,
    /// Read-only attribute handling.
    pub read_only: ReadOnlyPolicy,
}

impl ValidationPolicy {
    /// Returns true when `name` contains the reserved marker or any extra one.
    #[must_use]
    pub fn is_credential(&self, name: &str) -> bool {
        name.contains(DEFAULT_CREDENTIAL_MARKER)
            || self.credential_markers.iter().any(|marker| name.contains(marker.as_str()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A single desired-setting violation.
///
/// # Invariants
/// - `Display` output is part of the operator-visible status contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingValidationError {
    /// Credential fields cannot be set through desired settings.
    #[error("Cannot set Password field")]
    CredentialField {
        /// Offending setting name.
        name: String,
    },
    /// The setting is absent from the latest hardware reading.
    #[error("Setting {name} is not in the Status field")]
    NotInStatus {
        /// Offending setting name.
        name: String,
    },
    /// The attribute is read-only and the policy rejects writes.
    #[error("Setting {name} is invalid, attribute is read-only")]
    ReadOnly {
        /// Offending setting name.
        name: String,
    },
    /// String longer than the schema's maximum length.
    #[error("Setting {name} is invalid, string {value} length is above maximum length {max}")]
    StringTooLong {
        /// Offending setting name.
        name: String,
        /// Desired value.
        value: String,
        /// Maximum length.
        max: u64,
    },
    /// String shorter than the schema's minimum length.
    #[error("Setting {name} is invalid, string {value} length is below minimum length {min}")]
    StringTooShort {
        /// Offending setting name.
        name: String,
        /// Desired value.
        value: String,
        /// Minimum length.
        min: u64,
    },
    /// Value is not an integer for an integer attribute.
    #[error("Setting {name} is invalid, String {value} entered while integer expected")]
    NotAnInteger {
        /// Offending setting name.
        name: String,
        /// Desired value.
        value: String,
    },
    /// Integer above the schema's upper bound.
    #[error("Setting {name} is invalid, integer {value} is above maximum value {max}")]
    IntegerTooLarge {
        /// Offending setting name.
        name: String,
        /// Desired value.
        value: i64,
        /// Upper bound.
        max: i64,
    },
    /// Integer below the schema's lower bound.
    #[error("Setting {name} is invalid, integer {value} is below minimum value {min}")]
    IntegerTooSmall {
        /// Offending setting name.
        name: String,
        /// Desired value.
        value: i64,
        /// Lower bound.
        min: i64,
    },
    /// Value outside the enumeration's allowable values.
    #[error("Setting {name} is invalid, unknown enumeration value - {value}")]
    UnknownEnumValue {
        /// Offending setting name.
        name: String,
        /// Desired value.
        value: String,
    },
}

impl SettingValidationError {
    /// Returns the name of the offending setting.
    #[must_use]
    pub fn setting_name(&self) -> &str {
        match self {
            Self::CredentialField {
                name,
            }
            | Self::NotInStatus {
                name,
            }
            | Self::ReadOnly {
                name,
            }
            | Self::StringTooLong {
                name,
                ..
            }
            | Self::StringTooShort {
                name,
                ..
            }
            | Self::NotAnInteger {
                name,
                ..
            }
            | Self::IntegerTooLarge {
                name,
                ..
            }
            | Self::IntegerTooSmall {
                name,
                ..
            }
            | Self::UnknownEnumValue {
                name,
                ..
            } => name,
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates desired settings against the latest reading and schema.
///
/// Settings are visited in key order so the output is deterministic. An empty
/// result means the desired settings are valid. Attributes missing from
/// `schema` are only subject to the naming and presence checks.
#[must_use]
pub fn validate_settings(
    desired: &DesiredSettingsMap,
    current: &SettingsMap,
    schema: &SchemaMap,
    policy: &ValidationPolicy,
) -> Vec<SettingValidationError> {
    desired
        .iter()
        .filter_map(|(name, value)| validate_setting(name, value, current, schema, policy))
        .collect()
}

/// Renders validation errors into a single condition message.
#[must_use]
pub fn render_validation_errors(errors: &[SettingValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(ERROR_SEPARATOR)
}

/// Validates one desired setting, returning its first violation.
fn validate_setting(
    name: &str,
    value: &SettingValue,
    current: &SettingsMap,
    schema: &SchemaMap,
    policy: &ValidationPolicy,
) -> Option<SettingValidationError> {
    if policy.is_credential(name) {
        return Some(SettingValidationError::CredentialField {
            name: name.to_string(),
        });
    }
    if !current.contains_key(name) {
        return Some(SettingValidationError::NotInStatus {
            name: name.to_string(),
        });
    }
    let attribute = schema.get(name)?;
    if policy.read_only == ReadOnlyPolicy::Reject && attribute.is_read_only() {
        return Some(SettingValidationError::ReadOnly {
            name: name.to_string(),
        });
    }
    check_type(name, value, attribute)
}

/// Applies the type rule for the attribute's declared type.
fn check_type(
    name: &str,
    value: &SettingValue,
    attribute: &SettingSchema,
) -> Option<SettingValidationError> {
    match &attribute.attribute_type {
        AttributeType::String => check_string(name, value, attribute),
        AttributeType::Integer => check_integer(name, value, attribute),
        AttributeType::Enumeration => check_enumeration(name, value, attribute),
        AttributeType::Unknown(_) => None,
    }
}

/// Checks string length bounds in characters.
fn check_string(
    name: &str,
    value: &SettingValue,
    attribute: &SettingSchema,
) -> Option<SettingValidationError> {
    let rendered = value.to_string();
    let length = u64::try_from(rendered.chars().count()).unwrap_or(u64::MAX);
    if let Some(max) = attribute.max_length
        && length > max
    {
        return Some(SettingValidationError::StringTooLong {
            name: name.to_string(),
            value: rendered,
            max,
        });
    }
    if let Some(min) = attribute.min_length
        && length < min
    {
        return Some(SettingValidationError::StringTooShort {
            name: name.to_string(),
            value: rendered,
            min,
        });
    }
    None
}

/// Checks that the value parses as an integer within bounds.
fn check_integer(
    name: &str,
    value: &SettingValue,
    attribute: &SettingSchema,
) -> Option<SettingValidationError> {
    let Some(parsed) = value.as_integer() else {
        return Some(SettingValidationError::NotAnInteger {
            name: name.to_string(),
            value: value.to_string(),
        });
    };
    if let Some(max) = attribute.upper_bound
        && parsed > max
    {
        return Some(SettingValidationError::IntegerTooLarge {
            name: name.to_string(),
            value: parsed,
            max,
        });
    }
    if let Some(min) = attribute.lower_bound
        && parsed < min
    {
        return Some(SettingValidationError::IntegerTooSmall {
            name: name.to_string(),
            value: parsed,
            min,
        });
    }
    None
}

/// Checks enumeration membership.
fn check_enumeration(
    name: &str,
    value: &SettingValue,
    attribute: &SettingSchema,
) -> Option<SettingValidationError> {
    let rendered = value.to_string();
    let allowed =
        attribute.allowable_values.as_ref().is_some_and(|values| values.contains(&rendered));
    if allowed {
        return None;
    }
    Some(SettingValidationError::UnknownEnumValue {
        name: name.to_string(),
        value: rendered,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
