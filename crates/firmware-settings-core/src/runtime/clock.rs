// crates/firmware-settings-core/src/runtime/clock.rs
// ============================================================================
// Module: Clocks
// Description: Wall-clock and logical implementations of the Clock interface.
// Purpose: Stamp status timestamps in production and deterministic tests.
// Dependencies: crate::{core, interfaces}, time
// ============================================================================

//! ## Overview
//! [`SystemClock`] reads UTC wall-clock time. [`LogicalClock`] hands out a
//! strictly increasing counter so replayed passes are reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use time::OffsetDateTime;

use crate::core::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// UTC wall clock with millisecond resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Timestamp::UnixMillis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

// ============================================================================
// SECTION: Logical Clock
// ============================================================================

/// Monotonic counter clock.
#[derive(Debug, Default)]
pub struct LogicalClock {
    /// Last value handed out.
    counter: AtomicU64,
}

impl LogicalClock {
    /// Creates a clock whose first tick is `start + 1`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        let previous = self.counter.fetch_add(1, Ordering::SeqCst);
        Timestamp::Logical(previous.saturating_add(1))
    }
}
