// crates/firmware-settings-core/tests/reconciler.rs
// ============================================================================
// Module: Reconciler Tests
// Description: End-to-end reconciliation passes against the in-memory store.
// Purpose: Validate committed status, schema sharing, and conflict handling.
// Dependencies: firmware-settings-core
// ============================================================================
//! ## Overview
//! Drives full passes from a hardware reading to a committed record and
//! checks status settings, schema references, conditions, and retries.

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

use std::sync::atomic::Ordering;

use common::FailingReader;
use common::FixedReader;
use common::HOST_NAMESPACE;
use common::RacingStore;
use common::current_schema;
use common::current_settings;
use common::desired;
use common::full_reading;
use common::host_key;
use common::host_with;
use common::other_host_key;
use common::seed_schema;
use common::settings;
use common::store_with;
use common::valid_desired;
use common::version;
use firmware_settings_core::CONDITION_CHANGE_DETECTED;
use firmware_settings_core::CONDITION_VALID;
use firmware_settings_core::ConditionStatus;
use firmware_settings_core::DesiredSettingsMap;
use firmware_settings_core::FirmwareReading;
use firmware_settings_core::HostFirmwareSettings;
use firmware_settings_core::InMemoryObjectStore;
use firmware_settings_core::LogicalClock;
use firmware_settings_core::ObjectKey;
use firmware_settings_core::REASON_CONFIGURATION_ERROR;
use firmware_settings_core::REASON_SUCCESS;
use firmware_settings_core::ReconcileError;
use firmware_settings_core::ReconcileOutcome;
use firmware_settings_core::Reconciler;
use firmware_settings_core::ReconcilerConfig;
use firmware_settings_core::SchemaReference;
use firmware_settings_core::SchemaStore;
use firmware_settings_core::SettingsMap;
use firmware_settings_core::SettingsStore;
use firmware_settings_core::Timestamp;
use firmware_settings_core::schema_name;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn reconciler<S>(store: S) -> Reconciler<S, LogicalClock>
where
    S: SettingsStore + SchemaStore,
{
    Reconciler::new(store, LogicalClock::default(), ReconcilerConfig::default())
}

fn expected_reference() -> SchemaReference {
    SchemaReference {
        name: schema_name(&current_schema()).unwrap(),
        namespace: HOST_NAMESPACE.to_string(),
    }
}

fn stored(store: &InMemoryObjectStore) -> HostFirmwareSettings {
    store.get_settings(&host_key()).unwrap().expect("record").value
}

// ============================================================================
// SECTION: First Reconciliation
// ============================================================================

#[test]
fn initial_record_without_schema_creates_schema_and_is_valid() {
    let store = store_with(&HostFirmwareSettings::new(host_key()));
    let outcome = reconciler(store.clone()).reconcile(&host_key(), &full_reading()).unwrap();

    assert!(!outcome.changed);
    assert!(outcome.is_valid());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.settings.version, version(2));
    assert_eq!(outcome.schema_ref, Some(expected_reference()));

    let record = stored(&store);
    assert_eq!(record.status.settings, current_settings());
    assert_eq!(record.status.schema_ref, Some(expected_reference()));
    assert_eq!(record.status.conditions.types(), vec![CONDITION_VALID]);
    let valid = record.status.conditions.get(CONDITION_VALID).expect("valid");
    assert_eq!(valid.status, ConditionStatus::True);
    assert_eq!(valid.reason, REASON_SUCCESS);
    assert!(valid.message.is_empty());
    assert_eq!(record.status.last_updated, Some(Timestamp::Logical(1)));

    let schema = store.get_schema(&expected_reference().key()).unwrap().expect("schema");
    assert_eq!(schema.version, version(1));
    assert_eq!(schema.value.owners, vec![host_key()]);
    assert_eq!(schema.value.spec.schema, current_schema());
}

#[test]
fn initial_record_with_existing_schema_appends_owner() {
    let store = store_with(&HostFirmwareSettings::new(host_key()));
    seed_schema(&store, &current_schema());
    let outcome = reconciler(store.clone()).reconcile(&host_key(), &full_reading()).unwrap();

    assert!(outcome.is_valid());
    assert_eq!(stored(&store).status.conditions.types(), vec![CONDITION_VALID]);
    let schema = store.get_schema(&expected_reference().key()).unwrap().expect("schema");
    assert_eq!(schema.version, version(2));
    assert_eq!(schema.value.owners, vec![
        ObjectKey::new("dummyhfs", HOST_NAMESPACE),
        host_key()
    ]);
}

// ============================================================================
// SECTION: Drift and Validation
// ============================================================================

#[test]
fn updated_settings_raise_change_detected_before_valid() {
    let mut record = host_with(
        desired(&[
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Enabled"),
            ("AssetTag", "Z98765432"),
        ]),
        settings(&[
            ("AssetTag", "Z98765432"),
            ("L2Cache", "10x256 KB"),
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Enabled"),
        ]),
    );
    record.status.schema_ref = Some(expected_reference());
    let store = store_with(&record);
    seed_schema(&store, &current_schema());

    let outcome = reconciler(store.clone()).reconcile(&host_key(), &full_reading()).unwrap();

    assert!(outcome.changed);
    assert!(outcome.is_valid());
    let record = stored(&store);
    assert_eq!(record.status.settings, current_settings());
    assert_eq!(record.status.conditions.types(), vec![CONDITION_CHANGE_DETECTED, CONDITION_VALID]);
    assert!(record.status.conditions.is_true(CONDITION_CHANGE_DETECTED));
    assert!(record.status.conditions.is_true(CONDITION_VALID));
}

#[test]
fn invalid_desired_setting_marks_configuration_error() {
    let mut record = host_with(
        desired(&[("NetworkBootRetryCount", "1000"), ("ProcVirtualization", "Enabled")]),
        settings(&[
            ("L2Cache", "10x256 KB"),
            ("NetworkBootRetryCount", "10"),
            ("ProcVirtualization", "Enabled"),
        ]),
    );
    record.status.schema_ref = Some(expected_reference());
    let store = store_with(&record);
    seed_schema(&store, &current_schema());

    let outcome = reconciler(store.clone()).reconcile(&host_key(), &full_reading()).unwrap();

    assert!(outcome.changed);
    assert!(!outcome.is_valid());
    let record = stored(&store);
    assert_eq!(record.status.conditions.types(), vec![CONDITION_CHANGE_DETECTED, CONDITION_VALID]);
    let valid = record.status.conditions.get(CONDITION_VALID).expect("valid");
    assert_eq!(valid.status, ConditionStatus::False);
    assert_eq!(valid.reason, REASON_CONFIGURATION_ERROR);
    assert_eq!(
        valid.message,
        "Setting NetworkBootRetryCount is invalid, integer 1000 is above maximum value 20"
    );
}

#[test]
fn change_detected_stays_ahead_of_valid_on_later_passes() {
    let record = host_with(valid_desired(), common::previous_settings());
    let store = store_with(&record);
    let reconciler = reconciler(store.clone());
    reconciler.reconcile(&host_key(), &full_reading()).unwrap();

    let mut drifted = full_reading();
    drifted.settings.insert("SecureBoot".to_string(), "Disabled".to_string());
    let outcome = reconciler.reconcile(&host_key(), &drifted).unwrap();

    assert!(outcome.changed);
    assert_eq!(
        outcome.settings.value.status.conditions.types(),
        vec![CONDITION_CHANGE_DETECTED, CONDITION_VALID]
    );
}

// ============================================================================
// SECTION: Idempotence
// ============================================================================

#[test]
fn repeating_a_pass_with_the_same_reading_is_idempotent() {
    let record = host_with(
        desired(&[("NetworkBootRetryCount", "1000")]),
        common::previous_settings(),
    );
    let store = store_with(&record);
    let reconciler = reconciler(store.clone());

    let first = reconciler.reconcile(&host_key(), &full_reading()).unwrap();
    let second = reconciler.reconcile(&host_key(), &full_reading()).unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    let first_status = &first.settings.value.status;
    let second_status = &second.settings.value.status;
    assert_eq!(first_status.settings, second_status.settings);
    assert_eq!(first_status.schema_ref, second_status.schema_ref);
    assert_eq!(first_status.conditions, second_status.conditions);
    assert_eq!(first.errors, second.errors);

    let schema = store.get_schema(&expected_reference().key()).unwrap().expect("schema");
    assert_eq!(schema.version, version(1));
    assert_eq!(schema.value.owners, vec![host_key()]);
}

#[test]
fn valid_transition_time_moves_only_when_status_flips() {
    let record = host_with(desired(&[("NetworkBootRetryCount", "1000")]), current_settings());
    let store = store_with(&record);
    let reconciler = reconciler(store.clone());

    let first = reconciler.reconcile(&host_key(), &full_reading()).unwrap();
    let second = reconciler.reconcile(&host_key(), &full_reading()).unwrap();
    let time_of = |outcome: &ReconcileOutcome| {
        outcome
            .settings
            .value
            .status
            .conditions
            .get(CONDITION_VALID)
            .expect("valid")
            .last_transition_time
    };
    assert_eq!(time_of(&first), Timestamp::Logical(1));
    assert_eq!(time_of(&second), Timestamp::Logical(1));
    assert_eq!(second.settings.value.status.last_updated, Some(Timestamp::Logical(2)));

    let mut fixed = stored(&store);
    fixed.spec.settings = desired(&[("NetworkBootRetryCount", "15")]);
    let loaded_version = store.get_settings(&host_key()).unwrap().expect("record").version;
    store.update_settings(&fixed, loaded_version).unwrap();

    let third = reconciler.reconcile(&host_key(), &full_reading()).unwrap();
    assert!(third.is_valid());
    assert_eq!(time_of(&third), Timestamp::Logical(3));
}

// ============================================================================
// SECTION: Schema Reuse
// ============================================================================

#[test]
fn two_hosts_with_reordered_schema_share_it() {
    let store = InMemoryObjectStore::new();
    store.create_settings(&HostFirmwareSettings::new(host_key())).unwrap();
    store.create_settings(&HostFirmwareSettings::new(other_host_key())).unwrap();
    let reconciler = reconciler(store.clone());

    let reordered = FirmwareReading {
        settings: current_settings(),
        schema: Some(current_schema().into_iter().rev().collect()),
    };
    let first = reconciler.reconcile(&host_key(), &full_reading()).unwrap();
    let second = reconciler.reconcile(&other_host_key(), &reordered).unwrap();

    assert_eq!(first.schema_ref, second.schema_ref);
    let reference = first.schema_ref.expect("schema ref");
    let schema = store.get_schema(&reference.key()).unwrap().expect("schema");
    assert_eq!(schema.value.owners, vec![host_key(), other_host_key()]);
}

#[test]
fn reading_without_schema_reuses_existing_reference() {
    let record = host_with(desired(&[("NetworkBootRetryCount", "1000")]), current_settings());
    let store = store_with(&record);
    let reconciler = reconciler(store.clone());
    reconciler.reconcile(&host_key(), &full_reading()).unwrap();

    let bare = FirmwareReading {
        settings: current_settings(),
        schema: None,
    };
    let outcome = reconciler.reconcile(&host_key(), &bare).unwrap();

    assert_eq!(outcome.schema_ref, Some(expected_reference()));
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(
        outcome.errors[0].to_string(),
        "Setting NetworkBootRetryCount is invalid, integer 1000 is above maximum value 20"
    );
}

#[test]
fn reading_without_any_schema_checks_presence_only() {
    let record = host_with(
        desired(&[("NetworkBootRetryCount", "1000"), ("Missing", "x")]),
        SettingsMap::new(),
    );
    let store = store_with(&record);
    let bare = FirmwareReading {
        settings: current_settings(),
        schema: None,
    };
    let outcome = reconciler(store.clone()).reconcile(&host_key(), &bare).unwrap();

    assert_eq!(outcome.schema_ref, None);
    assert_eq!(
        outcome.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["Setting Missing is not in the Status field".to_string()]
    );
    assert_eq!(store.schema_count().unwrap(), 0);
}

#[test]
fn dangling_schema_reference_fails_closed() {
    let mut record = host_with(DesiredSettingsMap::new(), current_settings());
    record.status.schema_ref = Some(expected_reference());
    let store = store_with(&record);
    let bare = FirmwareReading {
        settings: current_settings(),
        schema: None,
    };

    let err = reconciler(store.clone()).reconcile(&host_key(), &bare).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::SchemaNotFound(key) if key == expected_reference().key()
    ));
    assert_eq!(store.get_settings(&host_key()).unwrap().expect("record").version, version(1));
}

// ============================================================================
// SECTION: Failures and Retries
// ============================================================================

#[test]
fn missing_record_is_not_created() {
    let store = InMemoryObjectStore::new();
    let err = reconciler(store.clone()).reconcile(&host_key(), &full_reading()).unwrap_err();
    assert!(matches!(err, ReconcileError::SettingsNotFound(key) if key == host_key()));
    assert!(store.get_settings(&host_key()).unwrap().is_none());
    assert_eq!(store.schema_count().unwrap(), 0);
}

#[test]
fn commit_conflict_is_retried_from_a_fresh_load() {
    let store = RacingStore::new(store_with(&HostFirmwareSettings::new(host_key())));
    store.race_settings(1);
    let outcome = reconciler(store.clone()).reconcile(&host_key(), &full_reading()).unwrap();

    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.settings.version, version(3));
    assert_eq!(stored(&store.inner).status.settings, current_settings());
}

#[test]
fn exhausted_commit_retries_surface_conflict_without_committing() {
    let store = RacingStore::new(store_with(&HostFirmwareSettings::new(host_key())));
    store.race_settings(10);
    let config = ReconcilerConfig {
        max_conflict_retries: 1,
        ..ReconcilerConfig::default()
    };
    let err = Reconciler::new(store.clone(), LogicalClock::default(), config)
        .reconcile(&host_key(), &full_reading())
        .unwrap_err();

    match err {
        ReconcileError::Conflict {
            key,
            attempts,
        } => {
            assert_eq!(key, host_key());
            assert_eq!(attempts, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let record = stored(&store.inner);
    assert!(record.status.settings.is_empty());
    assert!(record.status.conditions.is_empty());
    assert_eq!(record.status.last_updated, None);
}

// ============================================================================
// SECTION: Reader Integration
// ============================================================================

#[test]
fn reader_is_asked_for_schema_only_until_a_reference_exists() {
    let store = store_with(&HostFirmwareSettings::new(host_key()));
    let config = ReconcilerConfig {
        always_refresh_schema: false,
        ..ReconcilerConfig::default()
    };
    let reconciler = Reconciler::new(store, LogicalClock::default(), config);
    let reader = FixedReader::new(full_reading());

    reconciler.reconcile_from_reader(&host_key(), &reader).unwrap();
    let outcome = reconciler.reconcile_from_reader(&host_key(), &reader).unwrap();

    assert_eq!(reader.reads.load(Ordering::SeqCst), 2);
    assert_eq!(reader.schema_requests.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.schema_ref, Some(expected_reference()));
}

#[test]
fn reader_is_always_asked_for_schema_by_default() {
    let store = store_with(&HostFirmwareSettings::new(host_key()));
    let reconciler = reconciler(store);
    let reader = FixedReader::new(full_reading());

    reconciler.reconcile_from_reader(&host_key(), &reader).unwrap();
    reconciler.reconcile_from_reader(&host_key(), &reader).unwrap();

    assert_eq!(reader.schema_requests.load(Ordering::SeqCst), 2);
}

#[test]
fn reader_failure_leaves_record_untouched() {
    let store = store_with(&HostFirmwareSettings::new(host_key()));
    let err =
        reconciler(store.clone()).reconcile_from_reader(&host_key(), &FailingReader).unwrap_err();
    assert!(matches!(err, ReconcileError::Reader(_)));
    assert_eq!(store.get_settings(&host_key()).unwrap().expect("record").version, version(1));
}
