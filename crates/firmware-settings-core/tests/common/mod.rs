// crates/firmware-settings-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared hosts, readings, schemas, and store doubles.
// Purpose: Provide reusable deterministic fixtures for core tests.
// Dependencies: firmware-settings-core
// ============================================================================

//! ## Overview
//! Fixtures model a host whose controller reports five settings and a six
//! attribute schema, plus store doubles that simulate a concurrent writer
//! landing between a read and an update.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use firmware_settings_core::AttributeType;
use firmware_settings_core::DesiredSettingsMap;
use firmware_settings_core::FirmwareReader;
use firmware_settings_core::FirmwareReading;
use firmware_settings_core::FirmwareSchema;
use firmware_settings_core::HostFirmwareSettings;
use firmware_settings_core::InMemoryObjectStore;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::ReaderError;
use firmware_settings_core::ResourceVersion;
use firmware_settings_core::SchemaMap;
use firmware_settings_core::SchemaStore;
use firmware_settings_core::SettingSchema;
use firmware_settings_core::SettingValue;
use firmware_settings_core::SettingsMap;
use firmware_settings_core::SettingsStore;
use firmware_settings_core::StoreError;
use firmware_settings_core::Versioned;

// ============================================================================
// SECTION: Identities
// ============================================================================

pub const HOST_NAMESPACE: &str = "myHostNamespace";

pub fn host_key() -> ObjectKey {
    ObjectKey::new("myHostName", HOST_NAMESPACE)
}

pub fn other_host_key() -> ObjectKey {
    ObjectKey::new("otherHost", HOST_NAMESPACE)
}

// ============================================================================
// SECTION: Settings and Schema
// ============================================================================

/// Settings the controller currently reports.
pub fn current_settings() -> SettingsMap {
    settings(&[
        ("AssetTag", "X45672917"),
        ("L2Cache", "10x512 KB"),
        ("NetworkBootRetryCount", "20"),
        ("ProcVirtualization", "Disabled"),
        ("SecureBoot", "Enabled"),
    ])
}

/// Settings recorded by an earlier reading.
pub fn previous_settings() -> SettingsMap {
    settings(&[
        ("CustomPostMessage", "All tests passed"),
        ("L2Cache", "10x256 KB"),
        ("NetworkBootRetryCount", "10"),
        ("ProcVirtualization", "Enabled"),
        ("SecureBoot", "Enabled"),
        ("AssetTag", "X45672917"),
    ])
}

pub fn settings(pairs: &[(&str, &str)]) -> SettingsMap {
    pairs.iter().map(|(name, value)| ((*name).to_string(), (*value).to_string())).collect()
}

pub fn desired(pairs: &[(&str, &str)]) -> DesiredSettingsMap {
    pairs.iter().map(|(name, value)| ((*name).to_string(), SettingValue::from(*value))).collect()
}

pub fn string_attribute(min: u64, max: u64) -> SettingSchema {
    let mut attribute = SettingSchema::of_type(AttributeType::String);
    attribute.min_length = Some(min);
    attribute.max_length = Some(max);
    attribute
}

pub fn integer_attribute(lower: i64, upper: i64) -> SettingSchema {
    let mut attribute = SettingSchema::of_type(AttributeType::Integer);
    attribute.lower_bound = Some(lower);
    attribute.upper_bound = Some(upper);
    attribute
}

pub fn enum_attribute(values: &[&str]) -> SettingSchema {
    let mut attribute = SettingSchema::of_type(AttributeType::Enumeration);
    attribute.allowable_values =
        Some(values.iter().map(|value| (*value).to_string()).collect::<BTreeSet<_>>());
    attribute
}

/// Schema the controller reports for the fixture host.
pub fn current_schema() -> SchemaMap {
    let mut asset_tag = string_attribute(0, 20);
    asset_tag.unique = Some(true);
    let mut post_message = string_attribute(0, 20);
    post_message.unique = Some(false);
    post_message.read_only = Some(false);
    let mut l2_cache = string_attribute(0, 20);
    l2_cache.read_only = Some(true);
    let mut retry_count = integer_attribute(0, 20);
    retry_count.read_only = Some(false);
    let mut virtualization = enum_attribute(&["Enabled", "Disabled"]);
    virtualization.read_only = Some(false);
    let mut secure_boot = enum_attribute(&["Enabled", "Disabled"]);
    secure_boot.read_only = Some(true);

    let mut schema = SchemaMap::new();
    schema.insert("AssetTag".to_string(), asset_tag);
    schema.insert("CustomPostMessage".to_string(), post_message);
    schema.insert("L2Cache".to_string(), l2_cache);
    schema.insert("NetworkBootRetryCount".to_string(), retry_count);
    schema.insert("ProcVirtualization".to_string(), virtualization);
    schema.insert("SecureBoot".to_string(), secure_boot);
    schema
}

pub fn full_reading() -> FirmwareReading {
    FirmwareReading {
        settings: current_settings(),
        schema: Some(current_schema()),
    }
}

// ============================================================================
// SECTION: Store Seeding
// ============================================================================

/// Registers `record` in a fresh in-memory store.
pub fn store_with(record: &HostFirmwareSettings) -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    store.create_settings(record).unwrap();
    store
}

/// Seeds a schema owned by a placeholder host, as another host would have.
pub fn seed_schema(store: &InMemoryObjectStore, schema: &SchemaMap) -> FirmwareSchema {
    let placeholder = ObjectKey::new("dummyhfs", HOST_NAMESPACE);
    let record = FirmwareSchema::new(HOST_NAMESPACE, schema.clone(), &placeholder).unwrap();
    store.create_schema(&record).unwrap();
    record
}

// ============================================================================
// SECTION: Firmware Reader
// ============================================================================

/// Reader returning a fixed reading and recording whether the schema was asked for.
#[derive(Debug, Default)]
pub struct FixedReader {
    pub reading: FirmwareReading,
    pub schema_requests: AtomicU32,
    pub reads: AtomicU32,
}

impl FixedReader {
    pub fn new(reading: FirmwareReading) -> Self {
        Self {
            reading,
            schema_requests: AtomicU32::new(0),
            reads: AtomicU32::new(0),
        }
    }
}

impl FirmwareReader for FixedReader {
    fn read_settings(
        &self,
        _host: &ObjectKey,
        include_schema: bool,
    ) -> Result<FirmwareReading, ReaderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if include_schema {
            self.schema_requests.fetch_add(1, Ordering::SeqCst);
            return Ok(self.reading.clone());
        }
        Ok(FirmwareReading {
            settings: self.reading.settings.clone(),
            schema: None,
        })
    }
}

/// Reader that always fails.
#[derive(Debug, Default)]
pub struct FailingReader;

impl FirmwareReader for FailingReader {
    fn read_settings(
        &self,
        host: &ObjectKey,
        _include_schema: bool,
    ) -> Result<FirmwareReading, ReaderError> {
        Err(ReaderError::ReadFailed(format!("controller for {host} unreachable")))
    }
}

// ============================================================================
// SECTION: Racing Store
// ============================================================================

/// Store that lets a concurrent writer land before selected updates.
///
/// Each pending race bumps the stored record just before the caller's update
/// so the caller's version token goes stale.
#[derive(Debug, Default, Clone)]
pub struct RacingStore {
    pub inner: InMemoryObjectStore,
    settings_races: Arc<AtomicU32>,
    schema_races: Arc<AtomicU32>,
}

impl RacingStore {
    pub fn new(inner: InMemoryObjectStore) -> Self {
        Self {
            inner,
            settings_races: Arc::new(AtomicU32::new(0)),
            schema_races: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn race_settings(&self, count: u32) {
        self.settings_races.store(count, Ordering::SeqCst);
    }

    pub fn race_schema(&self, count: u32) {
        self.schema_races.store(count, Ordering::SeqCst);
    }

    fn take_race(counter: &AtomicU32) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

impl SettingsStore for RacingStore {
    fn get_settings(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<HostFirmwareSettings>>, StoreError> {
        self.inner.get_settings(key)
    }

    fn create_settings(
        &self,
        record: &HostFirmwareSettings,
    ) -> Result<ResourceVersion, StoreError> {
        self.inner.create_settings(record)
    }

    fn update_settings(
        &self,
        record: &HostFirmwareSettings,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        if Self::take_race(&self.settings_races)
            && let Some(current) = self.inner.get_settings(&record.key)?
        {
            self.inner.update_settings(&current.value, current.version)?;
        }
        self.inner.update_settings(record, expected)
    }
}

impl SchemaStore for RacingStore {
    fn get_schema(&self, key: &ObjectKey) -> Result<Option<Versioned<FirmwareSchema>>, StoreError> {
        self.inner.get_schema(key)
    }

    fn create_schema(&self, schema: &FirmwareSchema) -> Result<ResourceVersion, StoreError> {
        self.inner.create_schema(schema)
    }

    fn update_schema(
        &self,
        schema: &FirmwareSchema,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        if Self::take_race(&self.schema_races)
            && let Some(current) = self.inner.get_schema(&schema.key)?
        {
            let mut raced = current.value;
            let n = raced.owners.len();
            raced.add_owner(&ObjectKey::new(format!("racer-{n}"), HOST_NAMESPACE));
            self.inner.update_schema(&raced, current.version)?;
        }
        self.inner.update_schema(schema, expected)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a version token from a raw value.
pub fn version(raw: u64) -> ResourceVersion {
    ResourceVersion::from_raw(raw).unwrap()
}

/// Creates a host record with desired settings and a prior status reading.
pub fn host_with(
    desired_settings: DesiredSettingsMap,
    status: SettingsMap,
) -> HostFirmwareSettings {
    let mut record = HostFirmwareSettings::new(host_key()).with_desired(desired_settings);
    record.status.settings = status;
    record
}

/// Desired settings used by the valid-spec scenarios.
pub fn valid_desired() -> DesiredSettingsMap {
    desired(&[
        ("CustomPostMessage", "All tests passed"),
        ("ProcVirtualization", "Disabled"),
        ("NetworkBootRetryCount", "20"),
    ])
}
