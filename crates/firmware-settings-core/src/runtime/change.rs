// crates/firmware-settings-core/src/runtime/change.rs
// ============================================================================
// Module: Change Detector
// Description: Classifies transitions between successive hardware readings.
// Purpose: Decide whether a pass should raise the ChangeDetected condition.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A reading counts as a change only when there was a previous reading to
//! compare against. The first reading after registration initializes status
//! and is never reported as a change.

use crate::core::SettingsMap;

/// Returns true when `latest` differs from a non-empty `previous` reading.
///
/// Added, removed, and modified keys all count; ordering is irrelevant.
#[must_use]
pub fn detect_change(previous: &SettingsMap, latest: &SettingsMap) -> bool {
    if previous.is_empty() {
        return false;
    }
    previous != latest
}
