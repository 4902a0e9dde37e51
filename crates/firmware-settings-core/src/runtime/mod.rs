// crates/firmware-settings-core/src/runtime/mod.rs
// ============================================================================
// Module: Firmware Settings Runtime
// Description: Change detection, validation, schema resolution, and reconciliation.
// Purpose: Execute reconciliation passes against the collaborator interfaces.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the reconciliation engine. The change detector
//! and validation engine are pure; the schema resolver and reconciler talk to
//! stores through [`crate::interfaces`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod change;
pub mod clock;
pub mod reconciler;
pub mod schema_store;
pub mod store;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use change::detect_change;
pub use clock::LogicalClock;
pub use clock::SystemClock;
pub use reconciler::DEFAULT_MAX_CONFLICT_RETRIES;
pub use reconciler::ReconcileError;
pub use reconciler::ReconcileOutcome;
pub use reconciler::Reconciler;
pub use reconciler::ReconcilerConfig;
pub use schema_store::SchemaResolution;
pub use schema_store::SchemaResolveError;
pub use schema_store::SchemaResolver;
pub use schema_store::schema_name;
pub use store::InMemoryObjectStore;
pub use validation::ReadOnlyPolicy;
pub use validation::SettingValidationError;
pub use validation::ValidationPolicy;
pub use validation::render_validation_errors;
pub use validation::validate_settings;
