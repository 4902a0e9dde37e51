// crates/firmware-settings-core/src/core/mod.rs
// ============================================================================
// Module: Firmware Settings Core Types
// Description: Data model shared by the reconciler, stores, and CLI.
// Purpose: Group identifiers, settings, schemas, conditions, and hashing.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types describe the two persisted resources (host firmware settings and
//! firmware schemas), their identities, and the deterministic hashing used to
//! content-address schemas.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod conditions;
pub mod hashing;
pub mod identifiers;
pub mod record;
pub mod schema;
pub mod settings;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use conditions::CONDITION_CHANGE_DETECTED;
pub use conditions::CONDITION_VALID;
pub use conditions::Condition;
pub use conditions::ConditionSet;
pub use conditions::ConditionStatus;
pub use conditions::REASON_CONFIGURATION_ERROR;
pub use conditions::REASON_SUCCESS;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::ObjectKey;
pub use identifiers::ResourceVersion;
pub use identifiers::SchemaReference;
pub use identifiers::Versioned;
pub use record::FirmwareReading;
pub use record::HostFirmwareSettings;
pub use record::HostFirmwareSettingsSpec;
pub use record::HostFirmwareSettingsStatus;
pub use schema::AttributeType;
pub use schema::FirmwareSchema;
pub use schema::FirmwareSchemaSpec;
pub use schema::SchemaMap;
pub use schema::SettingSchema;
pub use settings::DesiredSettingsMap;
pub use settings::SettingValue;
pub use settings::SettingsMap;
pub use time::Timestamp;
