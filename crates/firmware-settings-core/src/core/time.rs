// crates/firmware-settings-core/src/core/time.rs
// ============================================================================
// Module: Status Time Model
// Description: Timestamps stamped into status fields and conditions.
// Purpose: Keep reconciliation passes deterministic and replayable.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! The reconciler never reads wall-clock time directly; it asks a
//! [`Clock`](crate::interfaces::Clock) for the value stamped into
//! `last_updated` and condition transition times. Tests drive passes with a
//! logical clock so only `last_updated` differs between otherwise identical
//! passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Timestamp recorded on host firmware settings status.
///
/// # Invariants
/// - Values come from a clock; monotonicity is the clock's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnixMillis(millis) => match rfc3339(*millis) {
                Some(text) => f.write_str(&text),
                None => write!(f, "unix-ms:{millis}"),
            },
            Self::Logical(value) => write!(f, "logical:{value}"),
        }
    }
}

/// Formats unix milliseconds as RFC 3339, or `None` when out of range.
fn rfc3339(millis: i64) -> Option<String> {
    let nanos = i128::from(millis).checked_mul(1_000_000)?;
    let moment = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    moment.format(&Rfc3339).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
