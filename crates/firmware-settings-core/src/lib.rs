// crates/firmware-settings-core/src/lib.rs
// ============================================================================
// Module: Firmware Settings Core Library
// Description: Public API surface for the firmware settings reconciler core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Firmware settings core reconciles the desired firmware (BIOS) settings of a
//! host against the settings its management controller reports, validating
//! every desired value against a content-addressed, shareable schema. It is
//! backend-agnostic and integrates with hardware drivers and object stores
//! through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Clock;
pub use interfaces::FirmwareReader;
pub use interfaces::ReaderError;
pub use interfaces::SchemaStore;
pub use interfaces::SettingsStore;
pub use interfaces::StoreError;
pub use runtime::DEFAULT_MAX_CONFLICT_RETRIES;
pub use runtime::InMemoryObjectStore;
pub use runtime::LogicalClock;
pub use runtime::ReadOnlyPolicy;
pub use runtime::ReconcileError;
pub use runtime::ReconcileOutcome;
pub use runtime::Reconciler;
pub use runtime::ReconcilerConfig;
pub use runtime::SchemaResolution;
pub use runtime::SchemaResolveError;
pub use runtime::SchemaResolver;
pub use runtime::SettingValidationError;
pub use runtime::SystemClock;
pub use runtime::ValidationPolicy;
pub use runtime::detect_change;
pub use runtime::render_validation_errors;
pub use runtime::schema_name;
pub use runtime::validate_settings;
