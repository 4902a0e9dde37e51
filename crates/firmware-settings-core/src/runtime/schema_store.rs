// crates/firmware-settings-core/src/runtime/schema_store.rs
// ============================================================================
// Module: Schema Resolver
// Description: Find-or-create for content-addressed firmware schemas.
// Purpose: Share one schema resource across hosts with identical firmware.
// Dependencies: thiserror, tracing, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`SchemaResolver::resolve`] turns a reported schema map into a stable
//! [`SchemaReference`]. The first host to report a schema creates it; later
//! hosts append themselves to its owner list. Concurrent resolvers race on the
//! store's version tokens and retry on conflict, so owner appends are never
//! lost.
//!
//! ## Invariants
//! - Stored schema content is never modified.
//! - A resolver returns only after its owner is durably recorded.
//! - A stored schema whose content differs from the reported one under the
//!   same name fails closed instead of being shared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::FirmwareSchema;
use crate::core::ObjectKey;
use crate::core::SchemaMap;
use crate::core::SchemaReference;
use crate::core::Versioned;
use crate::core::hashing::HashError;
use crate::interfaces::SchemaStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of conflict retries before giving up.
pub const DEFAULT_SCHEMA_CONFLICT_RETRIES: u32 = 3;

/// Returns the content-addressed name `schema` would be stored under.
///
/// # Errors
///
/// Returns [`HashError`] when the schema cannot be canonicalized.
pub fn schema_name(schema: &SchemaMap) -> Result<String, HashError> {
    FirmwareSchema::name_for(schema)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema resolution errors.
#[derive(Debug, Error)]
pub enum SchemaResolveError {
    /// Schema content could not be hashed.
    #[error("schema hashing failed: {0}")]
    Hash(#[from] HashError),
    /// Schema store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stored schema with the same name holds different content.
    #[error("schema {0} exists with different content")]
    ContentMismatch(ObjectKey),
    /// Concurrent writers kept invalidating the owner append.
    #[error("schema {key} owner update conflicted after {attempts} attempts")]
    Conflict {
        /// Schema identity.
        key: ObjectKey,
        /// Attempts made.
        attempts: u32,
    },
}

// ============================================================================
// SECTION: Resolution Result
// ============================================================================

/// Result of resolving a schema for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaResolution {
    /// Reference to record in host status.
    pub reference: SchemaReference,
    /// Stored schema after the owner was recorded.
    pub schema: Versioned<FirmwareSchema>,
    /// True when this call created the schema.
    pub created: bool,
    /// True when this call appended the owner to an existing schema.
    pub owner_added: bool,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Find-or-create resolver for shared firmware schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaResolver {
    /// Conflict retries after the first attempt.
    max_conflict_retries: u32,
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_CONFLICT_RETRIES)
    }
}

impl SchemaResolver {
    /// Creates a resolver allowing `max_conflict_retries` retries.
    #[must_use]
    pub const fn new(max_conflict_retries: u32) -> Self {
        Self {
            max_conflict_retries,
        }
    }

    /// Resolves `schema` in `namespace`, recording `owner` on the resource.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaResolveError`] when hashing or the store fails, when a
    /// name collision is detected, or when conflicts exhaust the retry budget.
    pub fn resolve<S>(
        &self,
        store: &S,
        namespace: &str,
        schema: &SchemaMap,
        owner: &ObjectKey,
    ) -> Result<SchemaResolution, SchemaResolveError>
    where
        S: SchemaStore + ?Sized,
    {
        let candidate = FirmwareSchema::new(namespace, schema.clone(), owner)?;
        let key = candidate.key.clone();
        let attempts = self.max_conflict_retries.saturating_add(1);
        for attempt in 1 ..= attempts {
            match Self::try_resolve(store, &candidate, owner) {
                Ok(resolution) => return Ok(resolution),
                Err(SchemaResolveError::Store(err)) if err.is_conflict() => {
                    debug!(schema = %key, attempt, error = %err, "schema update conflicted");
                }
                Err(err) => return Err(err),
            }
        }
        warn!(schema = %key, attempts, "schema owner update retries exhausted");
        Err(SchemaResolveError::Conflict {
            key,
            attempts,
        })
    }

    /// Performs one find-or-create attempt.
    fn try_resolve<S>(
        store: &S,
        candidate: &FirmwareSchema,
        owner: &ObjectKey,
    ) -> Result<SchemaResolution, SchemaResolveError>
    where
        S: SchemaStore + ?Sized,
    {
        let Some(existing) = store.get_schema(&candidate.key)? else {
            let version = store.create_schema(candidate)?;
            debug!(schema = %candidate.key, owner = %owner, "created firmware schema");
            return Ok(SchemaResolution {
                reference: candidate.reference(),
                schema: Versioned::new(version, candidate.clone()),
                created: true,
                owner_added: false,
            });
        };
        if existing.value.spec != candidate.spec {
            return Err(SchemaResolveError::ContentMismatch(candidate.key.clone()));
        }
        let mut updated = existing.value.clone();
        if !updated.add_owner(owner) {
            return Ok(SchemaResolution {
                reference: updated.reference(),
                schema: existing,
                created: false,
                owner_added: false,
            });
        }
        let version = store.update_schema(&updated, existing.version)?;
        debug!(schema = %updated.key, owner = %owner, "appended firmware schema owner");
        Ok(SchemaResolution {
            reference: updated.reference(),
            schema: Versioned::new(version, updated),
            created: false,
            owner_added: true,
        })
    }
}
