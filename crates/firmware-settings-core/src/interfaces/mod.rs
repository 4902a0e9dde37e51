// crates/firmware-settings-core/src/interfaces/mod.rs
// ============================================================================
// Module: Firmware Settings Interfaces
// Description: Backend-agnostic interfaces for storage, hardware reads, and time.
// Purpose: Define the collaborator surfaces used by the reconciler.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The reconciler reaches hardware, persistence, and time only through the
//! traits in this module. Stores implement optimistic concurrency: every read
//! returns a [`ResourceVersion`] and every update must present the version it
//! read. A stale version fails with [`StoreError::Conflict`], which is distinct
//! from [`StoreError::NotFound`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::FirmwareReading;
use crate::core::FirmwareSchema;
use crate::core::HostFirmwareSettings;
use crate::core::ObjectKey;
use crate::core::ResourceVersion;
use crate::core::Timestamp;
use crate::core::Versioned;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Object store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Record already exists on create.
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    /// Update presented a stale version token.
    #[error("object version conflict: {0}")]
    Conflict(String),
    /// Store I/O error.
    #[error("object store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("object store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("object store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("object store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("object store error: {0}")]
    Store(String),
}

impl StoreError {
    /// Returns true for optimistic-concurrency failures worth retrying.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::AlreadyExists(_))
    }
}

// ============================================================================
// SECTION: Settings Store
// ============================================================================

/// Persistence for host firmware settings resources.
pub trait SettingsStore {
    /// Loads a settings resource with its version token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_settings(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<HostFirmwareSettings>>, StoreError>;

    /// Creates a settings resource at [`ResourceVersion::INITIAL`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the key is taken.
    fn create_settings(&self, record: &HostFirmwareSettings)
    -> Result<ResourceVersion, StoreError>;

    /// Replaces a settings resource if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a stale version and
    /// [`StoreError::NotFound`] when the record is gone.
    fn update_settings(
        &self,
        record: &HostFirmwareSettings,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError>;
}

// ============================================================================
// SECTION: Schema Store
// ============================================================================

/// Persistence for shared firmware schema resources.
pub trait SchemaStore {
    /// Loads a firmware schema with its version token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_schema(&self, key: &ObjectKey) -> Result<Option<Versioned<FirmwareSchema>>, StoreError>;

    /// Creates a firmware schema at [`ResourceVersion::INITIAL`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the key is taken.
    fn create_schema(&self, schema: &FirmwareSchema) -> Result<ResourceVersion, StoreError>;

    /// Replaces a firmware schema if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a stale version and
    /// [`StoreError::NotFound`] when the record is gone.
    fn update_schema(
        &self,
        schema: &FirmwareSchema,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError>;
}

// ============================================================================
// SECTION: Firmware Reader
// ============================================================================

/// Hardware read errors.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The management controller could not be reached or answered with an error.
    #[error("firmware read failed: {0}")]
    ReadFailed(String),
}

/// Management-controller collaborator that reads firmware settings.
pub trait FirmwareReader {
    /// Reads current settings, and the schema when `include_schema` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] when the read fails.
    fn read_settings(
        &self,
        host: &ObjectKey,
        include_schema: bool,
    ) -> Result<FirmwareReading, ReaderError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of timestamps for status fields.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
