// crates/firmware-settings-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Object Store
// Description: Durable SettingsStore and SchemaStore backed by SQLite.
// Purpose: Persist versioned records with canonical serialization.
// Dependencies: firmware-settings-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each resource kind lives in its own table with one row per object. A row
//! carries the object's version token, its canonical JSON payload, and a
//! digest of that payload. Loads verify the digest and the payload identity
//! and fail closed on any mismatch. Updates compare the stored version with
//! the caller's token inside a transaction, so stale writers observe a
//! conflict rather than overwriting newer data.
//!
//! Firmware schema rows are additionally checked against their
//! content-addressed name on load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use firmware_settings_core::FirmwareSchema;
use firmware_settings_core::HostFirmwareSettings;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::ResourceVersion;
use firmware_settings_core::SchemaStore;
use firmware_settings_core::SettingsStore;
use firmware_settings_core::StoreError;
use firmware_settings_core::Versioned;
use firmware_settings_core::hashing::DEFAULT_HASH_ALGORITHM;
use firmware_settings_core::hashing::HashAlgorithm;
use firmware_settings_core::hashing::canonical_json_bytes;
use firmware_settings_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum canonical payload size accepted by the store.
pub const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default tuning for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Record does not exist.
    #[error("sqlite store record not found: {0}")]
    NotFound(String),
    /// Record already exists on create.
    #[error("sqlite store record already exists: {0}")]
    AlreadyExists(String),
    /// Update presented a stale version token.
    #[error("sqlite store version conflict: {0}")]
    Conflict(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::AlreadyExists(message) => Self::AlreadyExists(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "payload exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a rusqlite error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Stored Objects
// ============================================================================

/// A resource kind persisted in its own table.
trait StoredObject: Serialize + DeserializeOwned {
    /// Table holding rows of this kind.
    const TABLE: &'static str;
    /// Human-readable kind used in error messages.
    const LABEL: &'static str;

    /// Returns the object's identity.
    fn object_key(&self) -> &ObjectKey;

    /// Checks kind-specific integrity after a payload is decoded.
    fn verify_content(&self) -> Result<(), SqliteStoreError> {
        Ok(())
    }
}

impl StoredObject for HostFirmwareSettings {
    const TABLE: &'static str = "host_firmware_settings";
    const LABEL: &'static str = "host firmware settings";

    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}

impl StoredObject for FirmwareSchema {
    const TABLE: &'static str = "firmware_schemas";
    const LABEL: &'static str = "firmware schema";

    fn object_key(&self) -> &ObjectKey {
        &self.key
    }

    fn verify_content(&self) -> Result<(), SqliteStoreError> {
        let matches =
            self.name_matches_content().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if !matches {
            return Err(SqliteStoreError::Corrupt(format!(
                "firmware schema {} content does not match its name",
                self.key
            )));
        }
        Ok(())
    }
}

/// Raw row contents read inside a transaction.
struct StoredRow {
    /// Stored version token.
    version: i64,
    /// Canonical JSON payload.
    payload: Vec<u8>,
    /// Stored payload digest.
    hash: String,
    /// Stored digest algorithm label.
    algorithm: String,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed settings and schema store.
#[derive(Clone)]
pub struct SqliteObjectStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteObjectStore {
    /// Opens an `SQLite`-backed object store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        debug!(path = %config.path.display(), "opened sqlite object store");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads and verifies the object stored under `key`.
    fn get_object<T: StoredObject>(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<T>>, SqliteStoreError> {
        let row = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            let row = read_row::<T>(&tx, key)?;
            tx.commit().map_err(db_error)?;
            drop(guard);
            row
        };
        let Some(row) = row else {
            return Ok(None);
        };
        decode_row(key, row).map(Some)
    }

    /// Inserts a new object at the initial version.
    fn create_object<T: StoredObject>(
        &self,
        value: &T,
    ) -> Result<ResourceVersion, SqliteStoreError> {
        let key = value.object_key();
        let (payload, hash) = encode_payload(value)?;
        let version = version_to_sql(ResourceVersion::INITIAL)?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        if stored_version::<T>(&tx, key)?.is_some() {
            return Err(SqliteStoreError::AlreadyExists(format!("{} {key}", T::LABEL)));
        }
        tx.execute(
            &format!(
                "INSERT INTO {} (namespace, name, version, payload, payload_hash, \
                 hash_algorithm, saved_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                T::TABLE
            ),
            params![
                key.namespace,
                key.name,
                version,
                payload,
                hash,
                DEFAULT_HASH_ALGORITHM.label(),
                unix_millis()
            ],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(ResourceVersion::INITIAL)
    }

    /// Replaces an object when its stored version equals `expected`.
    fn update_object<T: StoredObject>(
        &self,
        value: &T,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, SqliteStoreError> {
        let key = value.object_key();
        let (payload, hash) = encode_payload(value)?;
        let next = expected.next().ok_or_else(|| {
            SqliteStoreError::Invalid(format!("{} {key} version overflow", T::LABEL))
        })?;
        let expected_sql = version_to_sql(expected)?;
        let next_sql = version_to_sql(next)?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let Some(current) = stored_version::<T>(&tx, key)? else {
            return Err(SqliteStoreError::NotFound(format!("{} {key}", T::LABEL)));
        };
        if current != expected_sql {
            return Err(SqliteStoreError::Conflict(format!(
                "{} {key} is at version {current}, update expected {expected}",
                T::LABEL
            )));
        }
        let updated = tx
            .execute(
                &format!(
                    "UPDATE {} SET version = ?1, payload = ?2, payload_hash = ?3, \
                     hash_algorithm = ?4, saved_at = ?5 WHERE namespace = ?6 AND name = ?7 AND \
                     version = ?8",
                    T::TABLE
                ),
                params![
                    next_sql,
                    payload,
                    hash,
                    DEFAULT_HASH_ALGORITHM.label(),
                    unix_millis(),
                    key.namespace,
                    key.name,
                    expected_sql
                ],
            )
            .map_err(db_error)?;
        if updated != 1 {
            return Err(SqliteStoreError::Conflict(format!(
                "{} {key} changed during update",
                T::LABEL
            )));
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(next)
    }
}

impl SettingsStore for SqliteObjectStore {
    fn get_settings(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Versioned<HostFirmwareSettings>>, StoreError> {
        self.get_object(key).map_err(StoreError::from)
    }

    fn create_settings(
        &self,
        record: &HostFirmwareSettings,
    ) -> Result<ResourceVersion, StoreError> {
        self.create_object(record).map_err(StoreError::from)
    }

    fn update_settings(
        &self,
        record: &HostFirmwareSettings,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        self.update_object(record, expected).map_err(StoreError::from)
    }
}

impl SchemaStore for SqliteObjectStore {
    fn get_schema(&self, key: &ObjectKey) -> Result<Option<Versioned<FirmwareSchema>>, StoreError> {
        self.get_object(key).map_err(StoreError::from)
    }

    fn create_schema(&self, schema: &FirmwareSchema) -> Result<ResourceVersion, StoreError> {
        self.create_object(schema).map_err(StoreError::from)
    }

    fn update_schema(
        &self,
        schema: &FirmwareSchema,
        expected: ResourceVersion,
    ) -> Result<ResourceVersion, StoreError> {
        self.update_object(schema, expected).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Codec
// ============================================================================

/// Serializes `value` canonically and returns the payload with its digest.
fn encode_payload<T: StoredObject>(value: &T) -> Result<(Vec<u8>, String), SqliteStoreError> {
    let payload =
        canonical_json_bytes(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_PAYLOAD_BYTES,
            actual_bytes: payload.len(),
        });
    }
    let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &payload);
    Ok((payload, digest.value))
}

/// Reads the stored version for `key`, if any.
fn stored_version<T: StoredObject>(
    tx: &Transaction<'_>,
    key: &ObjectKey,
) -> Result<Option<i64>, SqliteStoreError> {
    tx.query_row(
        &format!("SELECT version FROM {} WHERE namespace = ?1 AND name = ?2", T::TABLE),
        params![key.namespace, key.name],
        |row| row.get(0),
    )
    .optional()
    .map_err(db_error)
}

/// Reads the raw row for `key`, enforcing the payload size limit first.
fn read_row<T: StoredObject>(
    tx: &Transaction<'_>,
    key: &ObjectKey,
) -> Result<Option<StoredRow>, SqliteStoreError> {
    let metadata = tx
        .query_row(
            &format!(
                "SELECT version, length(payload), payload_hash, hash_algorithm FROM {} WHERE \
                 namespace = ?1 AND name = ?2",
                T::TABLE
            ),
            params![key.namespace, key.name],
            |row| {
                let version: i64 = row.get(0)?;
                let length: i64 = row.get(1)?;
                let hash: String = row.get(2)?;
                let algorithm: String = row.get(3)?;
                Ok((version, length, hash, algorithm))
            },
        )
        .optional()
        .map_err(db_error)?;
    let Some((version, length, hash, algorithm)) = metadata else {
        return Ok(None);
    };
    let length = usize::try_from(length).map_err(|_| {
        SqliteStoreError::Invalid(format!("negative payload length for {} {key}", T::LABEL))
    })?;
    if length > MAX_PAYLOAD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_PAYLOAD_BYTES,
            actual_bytes: length,
        });
    }
    let payload: Vec<u8> = tx
        .query_row(
            &format!("SELECT payload FROM {} WHERE namespace = ?1 AND name = ?2", T::TABLE),
            params![key.namespace, key.name],
            |row| row.get(0),
        )
        .map_err(db_error)?;
    Ok(Some(StoredRow {
        version,
        payload,
        hash,
        algorithm,
    }))
}

/// Verifies and decodes a stored row.
fn decode_row<T: StoredObject>(
    key: &ObjectKey,
    row: StoredRow,
) -> Result<Versioned<T>, SqliteStoreError> {
    let algorithm = parse_hash_algorithm(&row.algorithm)?;
    let expected = hash_bytes(algorithm, &row.payload);
    if expected.value != row.hash {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for {} {key}", T::LABEL)));
    }
    let version = u64::try_from(row.version)
        .ok()
        .and_then(ResourceVersion::from_raw)
        .ok_or_else(|| {
            SqliteStoreError::Corrupt(format!(
                "invalid version {} for {} {key}",
                row.version,
                T::LABEL
            ))
        })?;
    let value: T = serde_json::from_slice(&row.payload)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if value.object_key() != key {
        return Err(SqliteStoreError::Invalid(format!(
            "{} identity mismatch between key {key} and payload {}",
            T::LABEL,
            value.object_key()
        )));
    }
    value.verify_content()?;
    Ok(Versioned::new(version, value))
}

/// Converts a version token to its `SQLite` integer form.
fn version_to_sql(version: ResourceVersion) -> Result<i64, SqliteStoreError> {
    i64::try_from(version.get())
        .map_err(|_| SqliteStoreError::Invalid(format!("version {version} out of range")))
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path is empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS host_firmware_settings (
                    namespace TEXT NOT NULL,
                    name TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    payload BLOB NOT NULL,
                    payload_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL,
                    PRIMARY KEY (namespace, name)
                );
                CREATE TABLE IF NOT EXISTS firmware_schemas (
                    namespace TEXT NOT NULL,
                    name TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    payload BLOB NOT NULL,
                    payload_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL,
                    PRIMARY KEY (namespace, name)
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
