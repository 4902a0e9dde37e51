// crates/firmware-settings-core/src/core/schema.rs
// ============================================================================
// Module: Firmware Schema Model
// Description: Typed attribute constraints and the shared schema resource.
// Purpose: Describe what a host's firmware accepts and content-address it.
// Dependencies: serde, crate::core::hashing
// ============================================================================

//! ## Overview
//! A firmware schema maps each settable attribute to its type and legal-value
//! constraints. Hosts running identical firmware report identical schemas, so
//! the schema resource is named by a canonical hash of its content and shared
//! by every host that resolves to it.
//!
//! ## Invariants
//! - The schema name is a pure function of `spec.schema`.
//! - Content is never mutated after creation; only `owners` grows.
//! - `owners` holds each identity at most once, in first-seen order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::ObjectKey;
use crate::core::identifiers::SchemaReference;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix applied to every content-addressed schema name.
pub const SCHEMA_NAME_PREFIX: &str = "schema-";
/// Number of hex characters of the content digest kept in schema names.
pub const SCHEMA_NAME_HASH_CHARS: usize = 16;

// ============================================================================
// SECTION: Attribute Types
// ============================================================================

/// Declared type of a firmware attribute.
///
/// Unrecognized type names are preserved verbatim so the schema hash stays
/// faithful to what the controller reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeType {
    /// Free-form string with optional length bounds.
    String,
    /// Integer with optional inclusive bounds.
    Integer,
    /// One of a fixed set of allowable values.
    Enumeration,
    /// Any other type reported by the controller.
    Unknown(String),
}

impl AttributeType {
    /// Returns the wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Enumeration => "Enumeration",
            Self::Unknown(name) => name,
        }
    }
}

impl From<String> for AttributeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "String" => Self::String,
            "Integer" => Self::Integer,
            "Enumeration" => Self::Enumeration,
            _ => Self::Unknown(value),
        }
    }
}

impl From<AttributeType> for String {
    fn from(value: AttributeType) -> Self {
        match value {
            AttributeType::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Setting Schema
// ============================================================================

/// Constraints for a single firmware attribute.
///
/// Only the fields relevant to `attribute_type` are consulted during
/// validation; the rest are carried for hashing and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingSchema {
    /// Declared attribute type.
    pub attribute_type: AttributeType,
    /// Minimum string length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum string length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Inclusive integer lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<i64>,
    /// Inclusive integer upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<i64>,
    /// Allowable enumeration values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowable_values: Option<BTreeSet<String>>,
    /// Whether the value must be unique across hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    /// Whether the attribute is read-only on the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl SettingSchema {
    /// Creates a constraint set with only the type populated.
    #[must_use]
    pub const fn of_type(attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            min_length: None,
            max_length: None,
            lower_bound: None,
            upper_bound: None,
            allowable_values: None,
            unique: None,
            read_only: None,
        }
    }

    /// Returns true when the controller marks the attribute read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }
}

/// Attribute constraints keyed by attribute name.
pub type SchemaMap = BTreeMap<String, SettingSchema>;

// ============================================================================
// SECTION: Firmware Schema Resource
// ============================================================================

/// Immutable schema content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareSchemaSpec {
    /// Attribute constraints.
    pub schema: SchemaMap,
}

/// Shared, content-addressed firmware schema resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareSchema {
    /// Resource identity; `key.name` is derived from `spec`.
    pub key: ObjectKey,
    /// Schema content.
    pub spec: FirmwareSchemaSpec,
    /// Host firmware settings resources referencing this schema.
    #[serde(default)]
    pub owners: Vec<ObjectKey>,
}

impl FirmwareSchema {
    /// Computes the content-addressed name for a schema map.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the schema cannot be canonicalized.
    pub fn name_for(schema: &SchemaMap) -> Result<String, HashError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, schema)?;
        Ok(format!("{SCHEMA_NAME_PREFIX}{}", digest.short(SCHEMA_NAME_HASH_CHARS)))
    }

    /// Builds a new schema resource owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the schema cannot be canonicalized.
    pub fn new(
        namespace: impl Into<String>,
        schema: SchemaMap,
        owner: &ObjectKey,
    ) -> Result<Self, HashError> {
        let name = Self::name_for(&schema)?;
        Ok(Self {
            key: ObjectKey::new(name, namespace),
            spec: FirmwareSchemaSpec {
                schema,
            },
            owners: vec![owner.clone()],
        })
    }

    /// Returns a reference to this schema for host status.
    #[must_use]
    pub fn reference(&self) -> SchemaReference {
        SchemaReference::from(&self.key)
    }

    /// Returns true when `owner` already references this schema.
    #[must_use]
    pub fn has_owner(&self, owner: &ObjectKey) -> bool {
        self.owners.iter().any(|existing| existing == owner)
    }

    /// Adds `owner` if absent. Returns true when the owner set changed.
    pub fn add_owner(&mut self, owner: &ObjectKey) -> bool {
        if self.has_owner(owner) {
            return false;
        }
        self.owners.push(owner.clone());
        true
    }

    /// Returns true when `key.name` matches the hash of the content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the schema cannot be canonicalized.
    pub fn name_matches_content(&self) -> Result<bool, HashError> {
        Ok(Self::name_for(&self.spec.schema)? == self.key.name)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
