// crates/firmware-settings-core/src/core/conditions.rs
// ============================================================================
// Module: Status Conditions
// Description: Named boolean status flags with reasons and messages.
// Purpose: Record validation and change-detection outcomes on host status.
// Dependencies: serde, crate::core::time
// ============================================================================

//! ## Overview
//! Conditions form a small keyed collection: at most one condition per type,
//! ordered by when each was last set. Setting a condition that already exists
//! replaces it and moves it to the end, so within a reconciliation pass the
//! observable order matches the order the pass set them in.
//!
//! ## Invariants
//! - Condition types are unique within a set.
//! - `last_transition_time` only moves when the status flips.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Condition type recording that hardware settings changed since the last pass.
pub const CONDITION_CHANGE_DETECTED: &str = "ChangeDetected";
/// Condition type recording whether the desired settings validate.
pub const CONDITION_VALID: &str = "Valid";
/// Reason used for successful outcomes.
pub const REASON_SUCCESS: &str = "Success";
/// Reason used when desired settings fail validation.
pub const REASON_CONFIGURATION_ERROR: &str = "ConfigurationError";

// ============================================================================
// SECTION: Condition
// ============================================================================

/// Boolean status of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

/// A named status flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type, unique within a [`ConditionSet`].
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Condition status.
    pub status: ConditionStatus,
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Time the status last flipped.
    pub last_transition_time: Timestamp,
}

impl Condition {
    /// Creates a condition with an empty message.
    #[must_use]
    pub fn new(
        condition_type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            reason: reason.into(),
            message: String::new(),
            last_transition_time: now,
        }
    }

    /// Attaches a message to the condition.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

// ============================================================================
// SECTION: Condition Set
// ============================================================================

/// Ordered, type-keyed set of conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionSet(Vec<Condition>);

impl ConditionSet {
    /// Creates an empty condition set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `condition`, replacing any existing condition of the same type.
    ///
    /// The condition moves to the end of the set. When the status is
    /// unchanged the previous transition time is kept.
    pub fn upsert(&mut self, mut condition: Condition) {
        if let Some(index) =
            self.0.iter().position(|existing| existing.condition_type == condition.condition_type)
        {
            let previous = self.0.remove(index);
            if previous.status == condition.status {
                condition.last_transition_time = previous.last_transition_time;
            }
        }
        self.0.push(condition);
    }

    /// Returns the condition of the given type.
    #[must_use]
    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.0.iter().find(|condition| condition.condition_type == condition_type)
    }

    /// Returns true when the given condition type is present with status `True`.
    #[must_use]
    pub fn is_true(&self, condition_type: &str) -> bool {
        self.get(condition_type).is_some_and(|condition| condition.status == ConditionStatus::True)
    }

    /// Returns the condition types in order.
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        self.0.iter().map(|condition| condition.condition_type.as_str()).collect()
    }

    /// Iterates conditions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    /// Returns the number of conditions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no conditions are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConditionSet {
    type IntoIter = std::slice::Iter<'a, Condition>;
    type Item = &'a Condition;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
