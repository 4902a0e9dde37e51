// crates/firmware-settings-core/src/core/identifiers.rs
// ============================================================================
// Module: Resource Identifiers
// Description: Object keys, schema references, and version tokens.
// Purpose: Provide strongly typed identities with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every persisted resource is addressed by a `(name, namespace)` pair. Stores
//! hand out a [`ResourceVersion`] on each read and require it back on update so
//! concurrent writers detect lost updates instead of silently overwriting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Object Keys
// ============================================================================

/// Identity of a namespaced resource.
///
/// # Invariants
/// - Opaque UTF-8 strings; no normalization is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Resource name.
    pub name: String,
    /// Resource namespace.
    pub namespace: String,
}

impl ObjectKey {
    /// Creates a new object key.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reference from host firmware settings status to a firmware schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Firmware schema name (`schema-<hash>`).
    pub name: String,
    /// Firmware schema namespace.
    pub namespace: String,
}

impl SchemaReference {
    /// Returns the object key addressed by this reference.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.name.clone(), self.namespace.clone())
    }
}

impl From<&ObjectKey> for SchemaReference {
    fn from(key: &ObjectKey) -> Self {
        Self {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
        }
    }
}

// ============================================================================
// SECTION: Version Tokens
// ============================================================================

/// Optimistic-concurrency version token.
///
/// # Invariants
/// - Always >= 1; a freshly created record is version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(NonZeroU64);

impl ResourceVersion {
    /// Version assigned to newly created records.
    pub const INITIAL: Self = Self(NonZeroU64::MIN);

    /// Creates a version token from a raw value (returns `None` if zero).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the next version, or `None` on overflow.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// A stored value paired with the version token it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Version token for optimistic updates.
    pub version: ResourceVersion,
    /// Stored value.
    pub value: T,
}

impl<T> Versioned<T> {
    /// Pairs a value with its version token.
    #[must_use]
    pub const fn new(version: ResourceVersion, value: T) -> Self {
        Self {
            version,
            value,
        }
    }
}
