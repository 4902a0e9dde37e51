// crates/firmware-settings-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Object Store
// Description: Durable settings and schema store using SQLite.
// Purpose: Persist reconciled status across process restarts.
// Dependencies: firmware-settings-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed implementation of both
//! [`firmware_settings_core::SettingsStore`] and
//! [`firmware_settings_core::SchemaStore`]. Records are stored as canonical
//! JSON with a content hash that is verified on every load, and updates are
//! guarded by the same version tokens the in-memory store uses.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_PAYLOAD_BYTES;
pub use store::SqliteObjectStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
