// crates/firmware-settings-core/src/core/record.rs
// ============================================================================
// Module: Host Firmware Settings Resource
// Description: Per-host desired spec, observed status, and hardware readings.
// Purpose: Model the resource the reconciler reads and commits each pass.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! One [`HostFirmwareSettings`] exists per physical host. Operators own
//! `spec`; the reconciler owns and overwrites `status` on every pass. The
//! reconciler never creates or deletes these records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::conditions::ConditionSet;
use crate::core::identifiers::ObjectKey;
use crate::core::identifiers::SchemaReference;
use crate::core::schema::SchemaMap;
use crate::core::settings::DesiredSettingsMap;
use crate::core::settings::SettingsMap;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Host Firmware Settings
// ============================================================================

/// Operator-owned desired settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFirmwareSettingsSpec {
    /// Desired setting values.
    #[serde(default)]
    pub settings: DesiredSettingsMap,
}

/// Reconciler-owned observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFirmwareSettingsStatus {
    /// Settings from the latest hardware reading.
    #[serde(default)]
    pub settings: SettingsMap,
    /// Reference to the shared firmware schema, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<SchemaReference>,
    /// Validation and change-detection conditions.
    #[serde(default)]
    pub conditions: ConditionSet,
    /// Time of the last successful reconciliation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

/// Firmware settings resource for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFirmwareSettings {
    /// Host identity.
    pub key: ObjectKey,
    /// Desired settings.
    #[serde(default)]
    pub spec: HostFirmwareSettingsSpec,
    /// Observed status.
    #[serde(default)]
    pub status: HostFirmwareSettingsStatus,
}

impl HostFirmwareSettings {
    /// Creates an empty resource for a newly registered host.
    #[must_use]
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            spec: HostFirmwareSettingsSpec::default(),
            status: HostFirmwareSettingsStatus::default(),
        }
    }

    /// Replaces the desired settings.
    #[must_use]
    pub fn with_desired(mut self, settings: DesiredSettingsMap) -> Self {
        self.spec.settings = settings;
        self
    }
}

// ============================================================================
// SECTION: Hardware Reading
// ============================================================================

/// Snapshot returned by a management-controller read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareReading {
    /// Current settings reported by the controller.
    #[serde(default)]
    pub settings: SettingsMap,
    /// Attribute schema, when it was requested and returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaMap>,
}
