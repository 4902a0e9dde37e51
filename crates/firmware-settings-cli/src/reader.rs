// crates/firmware-settings-cli/src/reader.rs
// ============================================================================
// Module: File Firmware Reader
// Description: FirmwareReader backed by a JSON hardware reading on disk.
// Purpose: Feed captured management-controller output into a reconcile pass.
// Dependencies: firmware-settings-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! The file holds a [`FirmwareReading`]: `settings` plus an optional
//! `schema`. When the reconciler does not ask for the schema, any schema in
//! the file is dropped, matching a controller that only returns attributes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use firmware_settings_core::FirmwareReader;
use firmware_settings_core::FirmwareReading;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::ReaderError;
use tracing::debug;

use crate::read_bytes_with_limit;

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Reads a captured hardware reading from a JSON file.
pub(crate) struct FileFirmwareReader {
    /// Reading file path.
    path: PathBuf,
    /// Maximum accepted file size.
    max_bytes: usize,
}

impl FileFirmwareReader {
    /// Creates a reader for `path` bounded by `max_bytes`.
    pub(crate) const fn new(path: PathBuf, max_bytes: usize) -> Self {
        Self {
            path,
            max_bytes,
        }
    }
}

impl FirmwareReader for FileFirmwareReader {
    fn read_settings(
        &self,
        host: &ObjectKey,
        include_schema: bool,
    ) -> Result<FirmwareReading, ReaderError> {
        let bytes = read_bytes_with_limit(&self.path, self.max_bytes).map_err(|err| {
            ReaderError::ReadFailed(format!("{}: {err}", self.path.display()))
        })?;
        let mut reading: FirmwareReading = serde_json::from_slice(&bytes).map_err(|err| {
            ReaderError::ReadFailed(format!("{}: {err}", self.path.display()))
        })?;
        if !include_schema {
            reading.schema = None;
        }
        debug!(
            host = %host,
            settings = reading.settings.len(),
            schema = reading.schema.is_some(),
            "loaded hardware reading"
        );
        Ok(reading)
    }
}
