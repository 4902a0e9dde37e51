// crates/firmware-settings-core/src/runtime/store.rs
// ============================================================================
// Module: Firmware Settings In-Memory Store
// Description: Versioned in-memory store for settings and schema resources.
// Purpose: Provide a deterministic optimistic-concurrency store without I/O.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryObjectStore`] implements both [`SettingsStore`] and
//! [`SchemaStore`] over mutex-guarded maps. Each entry carries a
//! [`ResourceVersion`] bumped on every successful update, so stale writers
//! observe [`StoreError::Conflict`] exactly as they would against a durable
//! backend. Clones share the same underlying maps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::FirmwareSchema;
use crate::core::HostFirmwareSettings;
use crate::core::ObjectKey;
use crate::core::ResourceVersion;
use crate::core::Versioned;
use crate::interfaces::SchemaStore;
use crate::interfaces::SettingsStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Versioned Table
// ============================================================================

/// Mutex-guarded map of versioned values keyed by object identity.
#[derive(Debug)]
struct VersionedTable<T> {
    /// Entries keyed by object identity.
    entries: Arc<Mutex<BTreeMap<ObjectKey, Versioned<T>>>>,
    /// Resource label used in error messages.
    label: &'static str,
}

impl<T> Clone for VersionedTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            label: self.label,
        }
    }
}

impl<T: Clone> VersionedTable<T> {
    /// Creates an empty table.
    fn new(label: &'static str) -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
            label,
        }
    }

    /// Locks the table, mapping poisoning to a store error.
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<ObjectKey, Versioned<T>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Store(format!("{} store mutex poisoned", self.label)))
    }

    /// Returns a copy of the entry at `key`.
    fn get(&self, key: &ObjectKey) -> Result<Option<Versioned<T>>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Inserts a new entry at the initial version.
    fn create(&self, key: &ObjectKey, value: &T) -> Result<ResourceVersion, StoreError> {
        let mut guard = self.lock()?;
        if guard.contains_key(key) {
            return Err(StoreError::AlreadyExists(format!("{} {key}", self.label)));
        }
        guard.insert(key.clone(), Versioned::new(ResourceVersion::INITIAL, value.clone()));
        drop(guard);
        Ok(ResourceVersion::INITIAL)
    }

    /// Replaces the entry at `key` when it is still at `expected`.
    fn update(
        &self,
        key: &ObjectKey,
        value: &T,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        let mut guard = self.lock()?;
        let Some(entry) = guard.get_mut(key) else {
            return Err(StoreError::NotFound(format!("{} {key}", self.label)));
        };
        if entry.version != expected {
            return Err(StoreError::Conflict(format!(
                "{} {key} is at version {}, update expected {}",
                self.label,
                entry.version.get(),
                expected.get()
            )));
        }
        let next = entry.version.next().ok_or_else(|| {
            StoreError::Invalid(format!("{} {key} version overflow", self.label))
        })?;
        *entry = Versioned::new(next, value.clone());
        drop(guard);
        Ok(next)
    }
}

// ============================================================================
// SECTION: In-Memory Object Store
// ============================================================================

/// In-memory settings and schema store for tests and local runs.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    /// Host firmware settings resources.
    settings: VersionedTable<HostFirmwareSettings>,
    /// Shared firmware schema resources.
    schemas: VersionedTable<FirmwareSchema>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: VersionedTable::new("host firmware settings"),
            schemas: VersionedTable::new("firmware schema"),
        }
    }

    /// Returns the number of stored schemas.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the store mutex is poisoned.
    pub fn schema_count(&self) -> Result<usize, StoreError> {
        Ok(self.schemas.lock()?.len())
    }
}

impl SettingsStore for InMemoryObjectStore {
    fn get_settings(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<HostFirmwareSettings>>, StoreError> {
        self.settings.get(key)
    }

    fn create_settings(
        &self,
        record: &HostFirmwareSettings,
    ) -> Result<ResourceVersion, StoreError> {
        self.settings.create(&record.key, record)
    }

    fn update_settings(
        &self,
        record: &HostFirmwareSettings,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        self.settings.update(&record.key, record, expected)
    }
}

impl SchemaStore for InMemoryObjectStore {
    fn get_schema(&self, key: &ObjectKey) -> Result<Option<Versioned<FirmwareSchema>>, StoreError> {
        self.schemas.get(key)
    }

    fn create_schema(&self, schema: &FirmwareSchema) -> Result<ResourceVersion, StoreError> {
        self.schemas.create(&schema.key, schema)
    }

    fn update_schema(
        &self,
        schema: &FirmwareSchema,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        self.schemas.update(&schema.key, schema, expected)
    }
}
