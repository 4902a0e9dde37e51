// crates/firmware-settings-cli/src/backend.rs
// ============================================================================
// Module: CLI Store Backend
// Description: Runtime selection between the in-memory and SQLite stores.
// Purpose: Let one reconciler type run against whichever store is configured.
// Dependencies: firmware-settings-config, firmware-settings-core,
//               firmware-settings-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! The configured `[store]` section picks the backend at startup. Both
//! variants satisfy the settings and schema store contracts, so commands are
//! written once against [`StoreBackend`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use firmware_settings_config::StoreConfig;
use firmware_settings_core::FirmwareSchema;
use firmware_settings_core::HostFirmwareSettings;
use firmware_settings_core::InMemoryObjectStore;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::ResourceVersion;
use firmware_settings_core::SchemaStore;
use firmware_settings_core::SettingsStore;
use firmware_settings_core::StoreError;
use firmware_settings_core::Versioned;
use firmware_settings_store_sqlite::SqliteObjectStore;
use firmware_settings_store_sqlite::SqliteStoreError;
use tracing::warn;

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Store selected by configuration.
pub(crate) enum StoreBackend {
    /// Process-local store.
    Memory(InMemoryObjectStore),
    /// Durable `SQLite` store.
    Sqlite(SqliteObjectStore),
}

impl StoreBackend {
    /// Opens the backend described by `config`.
    pub(crate) fn open(config: &StoreConfig) -> Result<Self, SqliteStoreError> {
        match config.sqlite_config() {
            Some(sqlite) => Ok(Self::Sqlite(SqliteObjectStore::new(&sqlite)?)),
            None => {
                warn!("using the memory store; state is discarded when the command exits");
                Ok(Self::Memory(InMemoryObjectStore::new()))
            }
        }
    }
}

impl SettingsStore for StoreBackend {
    fn get_settings(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<HostFirmwareSettings>>, StoreError> {
        match self {
            Self::Memory(store) => store.get_settings(key),
            Self::Sqlite(store) => store.get_settings(key),
        }
    }

    fn create_settings(
        &self,
        record: &HostFirmwareSettings,
    ) -> Result<ResourceVersion, StoreError> {
        match self {
            Self::Memory(store) => store.create_settings(record),
            Self::Sqlite(store) => store.create_settings(record),
        }
    }

    fn update_settings(
        &self,
        record: &HostFirmwareSettings,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        match self {
            Self::Memory(store) => store.update_settings(record, expected),
            Self::Sqlite(store) => store.update_settings(record, expected),
        }
    }
}

impl SchemaStore for StoreBackend {
    fn get_schema(&self, key: &ObjectKey) -> Result<Option<Versioned<FirmwareSchema>>, StoreError> {
        match self {
            Self::Memory(store) => store.get_schema(key),
            Self::Sqlite(store) => store.get_schema(key),
        }
    }

    fn create_schema(&self, schema: &FirmwareSchema) -> Result<ResourceVersion, StoreError> {
        match self {
            Self::Memory(store) => store.create_schema(schema),
            Self::Sqlite(store) => store.create_schema(schema),
        }
    }

    fn update_schema(
        &self,
        schema: &FirmwareSchema,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        match self {
            Self::Memory(store) => store.update_schema(schema, expected),
            Self::Sqlite(store) => store.update_schema(schema, expected),
        }
    }
}
