// crates/firmware-settings-core/tests/store.rs
// ============================================================================
// Module: In-Memory Object Store Tests
// Description: Versioned create/get/update behavior of the in-memory store.
// Purpose: Validate optimistic concurrency semantics shared by all backends.
// Dependencies: firmware-settings-core
// ============================================================================
//! ## Overview
//! Ensures stale version tokens fail with a conflict distinct from not found,
//! duplicate creates are refused, and clones observe the same records.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::current_schema;
use common::current_settings;
use common::host_key;
use common::version;
use firmware_settings_core::FirmwareSchema;
use firmware_settings_core::HostFirmwareSettings;
use firmware_settings_core::InMemoryObjectStore;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::ResourceVersion;
use firmware_settings_core::SchemaStore;
use firmware_settings_core::SettingsStore;
use firmware_settings_core::StoreError;

// ============================================================================
// SECTION: Settings Records
// ============================================================================

#[test]
fn settings_round_trip_at_initial_version() {
    let store = InMemoryObjectStore::new();
    let record = HostFirmwareSettings::new(host_key());
    assert_eq!(store.create_settings(&record).unwrap(), ResourceVersion::INITIAL);
    let loaded = store.get_settings(&host_key()).unwrap().expect("record");
    assert_eq!(loaded.version, ResourceVersion::INITIAL);
    assert_eq!(loaded.value, record);
}

#[test]
fn missing_settings_load_as_none() {
    let store = InMemoryObjectStore::new();
    assert!(store.get_settings(&host_key()).unwrap().is_none());
}

#[test]
fn duplicate_settings_create_is_refused() {
    let store = InMemoryObjectStore::new();
    let record = HostFirmwareSettings::new(host_key());
    store.create_settings(&record).unwrap();
    let err = store.create_settings(&record).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
}

#[test]
fn update_with_current_version_bumps_version() {
    let store = InMemoryObjectStore::new();
    let mut record = HostFirmwareSettings::new(host_key());
    store.create_settings(&record).unwrap();
    record.status.settings = current_settings();
    let next = store.update_settings(&record, ResourceVersion::INITIAL).unwrap();
    assert_eq!(next, version(2));
    let loaded = store.get_settings(&host_key()).unwrap().expect("record");
    assert_eq!(loaded.version, version(2));
    assert_eq!(loaded.value.status.settings, current_settings());
}

#[test]
fn stale_version_update_conflicts_and_keeps_stored_value() {
    let store = InMemoryObjectStore::new();
    let mut record = HostFirmwareSettings::new(host_key());
    store.create_settings(&record).unwrap();
    store.update_settings(&record, ResourceVersion::INITIAL).unwrap();

    record.status.settings = current_settings();
    let err = store.update_settings(&record, ResourceVersion::INITIAL).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert!(err.is_conflict());
    let loaded = store.get_settings(&host_key()).unwrap().expect("record");
    assert_eq!(loaded.version, version(2));
    assert!(loaded.value.status.settings.is_empty());
}

#[test]
fn update_of_missing_record_is_not_found() {
    let store = InMemoryObjectStore::new();
    let record = HostFirmwareSettings::new(host_key());
    let err = store.update_settings(&record, ResourceVersion::INITIAL).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(!err.is_conflict());
}

#[test]
fn clones_share_records() {
    let store = InMemoryObjectStore::new();
    let clone = store.clone();
    clone.create_settings(&HostFirmwareSettings::new(host_key())).unwrap();
    assert!(store.get_settings(&host_key()).unwrap().is_some());
}

// ============================================================================
// SECTION: Schema Records
// ============================================================================

#[test]
fn schema_records_are_versioned_independently() {
    let store = InMemoryObjectStore::new();
    let owner = host_key();
    let mut schema =
        FirmwareSchema::new(common::HOST_NAMESPACE, current_schema(), &owner).unwrap();
    store.create_schema(&schema).unwrap();
    store.create_settings(&HostFirmwareSettings::new(host_key())).unwrap();

    schema.add_owner(&ObjectKey::new("second", common::HOST_NAMESPACE));
    assert_eq!(store.update_schema(&schema, ResourceVersion::INITIAL).unwrap(), version(2));
    let err = store.update_schema(&schema, ResourceVersion::INITIAL).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let loaded = store.get_schema(&schema.key).unwrap().expect("schema");
    assert_eq!(loaded.value.owners.len(), 2);
    assert_eq!(store.get_settings(&host_key()).unwrap().expect("record").version, version(1));
    assert_eq!(store.schema_count().unwrap(), 1);
}
