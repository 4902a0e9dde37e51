// crates/firmware-settings-core/src/runtime/reconciler.rs
// ============================================================================
// Module: Reconciliation Orchestrator
// Description: One reconciliation pass from hardware reading to committed status.
// Purpose: Keep host firmware settings status consistent with the hardware.
// Dependencies: thiserror, tracing, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! A pass loads the host's record, resolves the reported schema, detects
//! drift, validates desired settings, and commits the new status with the
//! version token it loaded. A stale token re-runs the whole pass against a
//! fresh load of the record; nothing is reported until a commit lands.
//!
//! ## Invariants
//! - The reconciler never creates or deletes settings records.
//! - `ChangeDetected` is always set before `Valid` within a pass.
//! - A failed pass leaves the stored record untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::CONDITION_CHANGE_DETECTED;
use crate::core::CONDITION_VALID;
use crate::core::Condition;
use crate::core::ConditionStatus;
use crate::core::FirmwareReading;
use crate::core::HostFirmwareSettings;
use crate::core::ObjectKey;
use crate::core::REASON_CONFIGURATION_ERROR;
use crate::core::REASON_SUCCESS;
use crate::core::SchemaMap;
use crate::core::SchemaReference;
use crate::core::Versioned;
use crate::interfaces::Clock;
use crate::interfaces::FirmwareReader;
use crate::interfaces::ReaderError;
use crate::interfaces::SchemaStore;
use crate::interfaces::SettingsStore;
use crate::interfaces::StoreError;
use crate::runtime::change::detect_change;
use crate::runtime::schema_store::SchemaResolveError;
use crate::runtime::schema_store::SchemaResolver;
use crate::runtime::validation::SettingValidationError;
use crate::runtime::validation::ValidationPolicy;
use crate::runtime::validation::render_validation_errors;
use crate::runtime::validation::validate_settings;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of commit retries after a version conflict.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Reconciler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Retries after a conflicting commit or schema owner append.
    pub max_conflict_retries: u32,
    /// Request the schema on every hardware read, not only the first.
    pub always_refresh_schema: bool,
    /// Validation naming and read-only policy.
    pub validation: ValidationPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            always_refresh_schema: true,
            validation: ValidationPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reconciliation pass errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No settings record exists for the host.
    #[error("host firmware settings not found: {0}")]
    SettingsNotFound(ObjectKey),
    /// The record references a schema that no longer exists.
    #[error("firmware schema not found: {0}")]
    SchemaNotFound(ObjectKey),
    /// Commits kept racing other writers.
    #[error("host firmware settings {key} commit conflicted after {attempts} attempts")]
    Conflict {
        /// Host identity.
        key: ObjectKey,
        /// Attempts made.
        attempts: u32,
    },
    /// Settings or schema store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Schema resolution failed.
    #[error(transparent)]
    Schema(#[from] SchemaResolveError),
    /// Hardware read failed.
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of a committed reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Committed record with its new version token.
    pub settings: Versioned<HostFirmwareSettings>,
    /// Schema recorded in status, if any.
    pub schema_ref: Option<SchemaReference>,
    /// True when the reading differed from the previous one.
    pub changed: bool,
    /// Validation errors reflected in the `Valid` condition.
    pub errors: Vec<SettingValidationError>,
    /// Passes run, including the committed one.
    pub attempts: u32,
}

impl ReconcileOutcome {
    /// Returns true when desired settings passed validation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A pass computed and committed without retries.
struct CommittedPass {
    /// Committed record.
    settings: Versioned<HostFirmwareSettings>,
    /// Change detection result.
    changed: bool,
    /// Validation errors.
    errors: Vec<SettingValidationError>,
}

// ============================================================================
// SECTION: Reconciler
// ============================================================================

/// Drives reconciliation passes against a store and clock.
#[derive(Debug)]
pub struct Reconciler<S, C> {
    /// Settings and schema persistence.
    store: S,
    /// Timestamp source.
    clock: C,
    /// Tuning.
    config: ReconcilerConfig,
}

impl<S, C> Reconciler<S, C>
where
    S: SettingsStore + SchemaStore,
    C: Clock,
{
    /// Creates a reconciler.
    #[must_use]
    pub const fn new(store: S, clock: C, config: ReconcilerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the reconciler configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reads the host through `reader` and reconciles the reading.
    ///
    /// The schema is requested when `always_refresh_schema` is set or the
    /// record has no schema reference yet.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the record is missing, the read fails,
    /// or the pass cannot be committed.
    pub fn reconcile_from_reader<R>(
        &self,
        key: &ObjectKey,
        reader: &R,
    ) -> Result<ReconcileOutcome, ReconcileError>
    where
        R: FirmwareReader + ?Sized,
    {
        let record = self.load(key)?;
        let include_schema =
            self.config.always_refresh_schema || record.value.status.schema_ref.is_none();
        debug!(host = %key, include_schema, "reading firmware settings");
        let reading = reader.read_settings(key, include_schema)?;
        self.reconcile(key, &reading)
    }

    /// Reconciles `reading` into the host's status and commits it.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the record or referenced schema is
    /// missing, the store fails, or conflicts exhaust the retry budget.
    pub fn reconcile(
        &self,
        key: &ObjectKey,
        reading: &FirmwareReading,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let attempts = self.config.max_conflict_retries.saturating_add(1);
        for attempt in 1 ..= attempts {
            debug!(host = %key, attempt, "starting reconciliation pass");
            match self.run_pass(key, reading) {
                Ok(pass) => {
                    let schema_ref = pass.settings.value.status.schema_ref.clone();
                    info!(
                        host = %key,
                        version = %pass.settings.version,
                        changed = pass.changed,
                        valid = pass.errors.is_empty(),
                        attempt,
                        "reconciliation pass committed"
                    );
                    return Ok(ReconcileOutcome {
                        settings: pass.settings,
                        schema_ref,
                        changed: pass.changed,
                        errors: pass.errors,
                        attempts: attempt,
                    });
                }
                Err(ReconcileError::Store(StoreError::Conflict(message))) => {
                    debug!(host = %key, attempt, conflict = %message, "commit conflicted");
                }
                Err(err) => return Err(err),
            }
        }
        warn!(host = %key, attempts, "reconciliation retries exhausted");
        Err(ReconcileError::Conflict {
            key: key.clone(),
            attempts,
        })
    }

    /// Loads the settings record, mapping absence to an error.
    fn load(&self, key: &ObjectKey) -> Result<Versioned<HostFirmwareSettings>, ReconcileError> {
        self.store.get_settings(key)?.ok_or_else(|| ReconcileError::SettingsNotFound(key.clone()))
    }

    /// Runs one pass and commits it with the loaded version token.
    fn run_pass(
        &self,
        key: &ObjectKey,
        reading: &FirmwareReading,
    ) -> Result<CommittedPass, ReconcileError> {
        let loaded = self.load(key)?;
        let mut record = loaded.value;
        let (schema_ref, schema) = self.resolve_schema(&record, reading)?;

        let changed = detect_change(&record.status.settings, &reading.settings);
        record.status.settings.clone_from(&reading.settings);
        record.status.schema_ref = schema_ref;

        let now = self.clock.now();
        if changed {
            debug!(host = %key, "firmware settings changed since last reading");
            record.status.conditions.upsert(Condition::new(
                CONDITION_CHANGE_DETECTED,
                ConditionStatus::True,
                REASON_SUCCESS,
                now,
            ));
        }

        let errors = validate_settings(
            &record.spec.settings,
            &record.status.settings,
            &schema,
            &self.config.validation,
        );
        let valid = if errors.is_empty() {
            Condition::new(CONDITION_VALID, ConditionStatus::True, REASON_SUCCESS, now)
        } else {
            let message = render_validation_errors(&errors);
            warn!(
                host = %key,
                errors = errors.len(),
                message = %message,
                "desired settings invalid"
            );
            Condition::new(CONDITION_VALID, ConditionStatus::False, REASON_CONFIGURATION_ERROR, now)
                .with_message(message)
        };
        record.status.conditions.upsert(valid);
        record.status.last_updated = Some(now);

        let version = match self.store.update_settings(&record, loaded.version) {
            Ok(version) => version,
            Err(StoreError::NotFound(_)) => {
                return Err(ReconcileError::SettingsNotFound(key.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(CommittedPass {
            settings: Versioned::new(version, record),
            changed,
            errors,
        })
    }

    /// Picks the schema for this pass.
    ///
    /// A reported schema is resolved through the shared store. Otherwise the
    /// existing reference is reloaded; with neither, validation runs against
    /// an empty schema.
    fn resolve_schema(
        &self,
        record: &HostFirmwareSettings,
        reading: &FirmwareReading,
    ) -> Result<(Option<SchemaReference>, SchemaMap), ReconcileError> {
        if let Some(reported) = &reading.schema {
            let resolver = SchemaResolver::new(self.config.max_conflict_retries);
            let resolution =
                resolver.resolve(&self.store, &record.key.namespace, reported, &record.key)?;
            debug!(
                host = %record.key,
                schema = %resolution.schema.value.key,
                created = resolution.created,
                owner_added = resolution.owner_added,
                "resolved firmware schema"
            );
            return Ok((Some(resolution.reference), resolution.schema.value.spec.schema));
        }
        let Some(reference) = &record.status.schema_ref else {
            debug!(host = %record.key, "no firmware schema available");
            return Ok((None, SchemaMap::new()));
        };
        let schema_key = reference.key();
        let stored = self
            .store
            .get_schema(&schema_key)?
            .ok_or_else(|| ReconcileError::SchemaNotFound(schema_key.clone()))?;
        Ok((Some(reference.clone()), stored.value.spec.schema))
    }
}
