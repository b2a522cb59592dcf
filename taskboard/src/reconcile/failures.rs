//! Bounded record of secondary writes that could not be applied.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::store::StoreError;

/// Default number of failures retained before FIFO eviction.
pub const DEFAULT_FAILURE_LOG_CAPACITY: usize = 1000;

/// A secondary write that failed after its primary write had committed.
///
/// The primary document is valid and was returned to the caller; the
/// relationship it participates in stays inconsistent until the next sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{mutation}: could not {operation}: {error}")]
pub struct PartialReconciliationFailure {
    /// Monotonic position in the failure log.
    pub sequence: u64,
    /// The mutation being reconciled, e.g. `update of task <id>`.
    pub mutation: String,
    /// The write that was left unapplied.
    pub operation: String,
    /// Why it failed (after the retry).
    pub error: String,
    /// When the failure was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// FIFO log of [`PartialReconciliationFailure`]s capped at a fixed size;
/// the oldest entry is dropped when the cap is exceeded.
pub struct FailureLog {
    entries: Mutex<VecDeque<PartialReconciliationFailure>>,
    capacity: usize,
    next_sequence: AtomicU64,
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FAILURE_LOG_CAPACITY)
    }
}

impl FailureLog {
    /// Creates an empty log holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Appends a failure and returns the recorded entry.
    pub fn record(
        &self,
        mutation: impl Into<String>,
        operation: impl Into<String>,
        error: &StoreError,
    ) -> PartialReconciliationFailure {
        let failure = PartialReconciliationFailure {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            mutation: mutation.into(),
            operation: operation.into(),
            error: error.to_string(),
            recorded_at: Utc::now(),
        };
        let mut entries = self.entries.lock();
        entries.push_back(failure.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        drop(entries);
        failure
    }

    /// Highest sequence number handed out so far (0 if none).
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::Relaxed) - 1
    }

    /// Drops every entry with `sequence <= through`.
    pub fn clear_through(&self, through: u64) {
        self.entries.lock().retain(|f| f.sequence > through);
    }

    /// Copy of the current entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PartialReconciliationFailure> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no failures are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
