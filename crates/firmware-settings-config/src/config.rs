// crates/firmware-settings-config/src/config.rs
// ============================================================================
// Module: Firmware Settings Configuration
// Description: Configuration loading and validation for the reconciler.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: firmware-settings-core, firmware-settings-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to defaults that validate. Missing
//! files or invalid values fail closed.
//!
//! ```toml
//! [reconcile]
//! max_conflict_retries = 3
//! always_refresh_schema = true
//!
//! [validation]
//! credential_markers = ["Secret"]
//! read_only = "ignore"
//!
//! [store]
//! type = "sqlite"
//! path = "fwsettings.sqlite"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use firmware_settings_core::DEFAULT_MAX_CONFLICT_RETRIES;
use firmware_settings_core::ReadOnlyPolicy;
use firmware_settings_core::ReconcilerConfig;
use firmware_settings_core::ValidationPolicy;
use firmware_settings_store_sqlite::SqliteStoreConfig;
use firmware_settings_store_sqlite::SqliteStoreMode;
use firmware_settings_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "firmware-settings.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "FWSETTINGS_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum conflict retries a pass may be configured with.
pub const MAX_CONFLICT_RETRIES: u32 = 100;
/// Maximum number of credential markers.
const MAX_CREDENTIAL_MARKERS: usize = 64;
/// Maximum length of a single credential marker.
const MAX_CREDENTIAL_MARKER_LENGTH: usize = 128;
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Firmware settings reconciler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirmwareSettingsConfig {
    /// Reconciliation pass configuration.
    #[serde(default)]
    pub reconcile: ReconcileSection,
    /// Desired-settings validation policy.
    #[serde(default)]
    pub validation: ValidationSection,
    /// Object store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

impl FirmwareSettingsConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then the `FWSETTINGS_CONFIG`
    /// environment variable, then `firmware-settings.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reconcile.validate()?;
        self.validation.validate()?;
        self.store.validate()
    }

    /// Builds the reconciler configuration described by this file.
    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            max_conflict_retries: self.reconcile.max_conflict_retries,
            always_refresh_schema: self.reconcile.always_refresh_schema,
            validation: self.validation.policy(),
        }
    }
}

// ============================================================================
// SECTION: Reconcile
// ============================================================================

/// Reconciliation pass tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileSection {
    /// Extra attempts after a version conflict on commit.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Request the schema on every hardware read.
    #[serde(default = "default_always_refresh_schema")]
    pub always_refresh_schema: bool,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_max_conflict_retries(),
            always_refresh_schema: default_always_refresh_schema(),
        }
    }
}

impl ReconcileSection {
    /// Validates reconcile settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "reconcile.max_conflict_retries must be at most {MAX_CONFLICT_RETRIES}"
            )));
        }
        Ok(())
    }
}

/// Returns the default conflict retry budget.
const fn default_max_conflict_retries() -> u32 {
    DEFAULT_MAX_CONFLICT_RETRIES
}

/// Returns the default schema refresh behavior.
const fn default_always_refresh_schema() -> bool {
    true
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Desired-settings validation policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationSection {
    /// Extra attribute-name fragments that mark credential fields.
    ///
    /// `Password` is always reserved; these entries only add to it.
    #[serde(default)]
    pub credential_markers: Vec<String>,
    /// Handling of writes to read-only attributes.
    #[serde(default)]
    pub read_only: ReadOnlyPolicy,
}

impl ValidationSection {
    /// Validates the policy section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.credential_markers.len() > MAX_CREDENTIAL_MARKERS {
            return Err(ConfigError::Invalid(format!(
                "validation.credential_markers exceeds {MAX_CREDENTIAL_MARKERS} entries"
            )));
        }
        for marker in &self.credential_markers {
            if marker.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "validation.credential_markers entries must be non-empty".to_string(),
                ));
            }
            if marker.len() > MAX_CREDENTIAL_MARKER_LENGTH {
                return Err(ConfigError::Invalid(
                    "validation.credential_markers entry exceeds max length".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the runtime validation policy.
    fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            credential_markers: self.credential_markers.clone(),
            read_only: self.read_only,
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Object store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local store; state is lost on exit.
    #[default]
    Memory,
    /// Durable `SQLite` store.
    Sqlite,
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
                    return Err(ConfigError::Invalid(format!(
                        "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` store configuration for the sqlite backend.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match self.store_type {
            StoreType::Memory => None,
            StoreType::Sqlite => self.path.as_ref().map(|path| SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
        }
    }
}

/// Returns the default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn explicit_path_wins_over_default() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }

    #[test]
    fn blank_store_path_is_rejected() {
        let err = validate_path_string("store.path", "   ").unwrap_err();
        assert!(err.to_string().contains("store.path must be non-empty"));
    }
}
