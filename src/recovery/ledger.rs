//! Attempt Ledger — bounded, time-queryable history of recovery attempts.
//!
//! Backs two things: the sliding-window retry quota and operator
//! diagnostics. Retention is a single global FIFO bound across all
//! services and actions, never persisted — history resets with the process.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults::MAX_HISTORY;

/// Immutable record of one execution of one action against one service.
///
/// Created exactly once per execution, whether the action returned a
/// natural failure or faulted; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub service: String,
    pub action: String,
    /// Wall-clock completion time. Quota windows are computed from this,
    /// so they survive short process pauses but are sensitive to system
    /// clock adjustments.
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// Fault detail when the action raised rather than returning `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only bounded buffer of [`RecoveryAttempt`]s.
///
/// Eviction is by insertion order, not timestamp — the two coincide under
/// normal operation, but insertion order keeps eviction deterministic
/// under clock skew.
#[derive(Debug)]
pub struct AttemptLedger {
    entries: VecDeque<RecoveryAttempt>,
    max_history: usize,
}

impl AttemptLedger {
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_history),
            max_history,
        }
    }

    /// Append an attempt, evicting the oldest entry once the bound is hit.
    pub fn record(&mut self, attempt: RecoveryAttempt) {
        if self.entries.len() >= self.max_history {
            self.entries.pop_front();
        }
        self.entries.push_back(attempt);
    }

    /// Count retained attempts for `(service, action)` with
    /// `timestamp >= since` (inclusive lower bound).
    ///
    /// Best-effort: attempts already evicted by the FIFO bound are treated
    /// as if they never happened, so the quota this feeds is never stricter
    /// than the nominal window rule, only potentially more permissive.
    pub fn count_matching(
        &self,
        service: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> usize {
        self.entries
            .iter()
            .filter(|a| a.service == service && a.action == action && a.timestamp >= since)
            .count()
    }

    /// Owned copy of the full retained history, most-recent-last.
    ///
    /// Never exposes the live buffer.
    pub fn snapshot(&self) -> Vec<RecoveryAttempt> {
        self.entries.iter().cloned().collect()
    }

    /// Owned copy of retained attempts with `timestamp >= since`.
    pub fn snapshot_since(&self, since: DateTime<Utc>) -> Vec<RecoveryAttempt> {
        self.entries
            .iter()
            .filter(|a| a.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AttemptLedger {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}
