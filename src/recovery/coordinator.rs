//! Recovery Coordinator — selects, gates, and executes remediation actions.
//!
//! Control flow per health event:
//!
//! ```text
//! health event
//!   → overlap check (Active-Recovery Set, atomic check-then-insert)
//!   → select applicable actions (registry order = priority)
//!   → per action: retry-quota check (trailing 1-hour wall-clock window)
//!   → execute sequentially until one succeeds or all are exhausted
//!   → record every execution in the Attempt Ledger
//!   → emit terminal recovery event for the external supervisor
//! ```
//!
//! Recoveries for different services may interleave freely (each event is
//! handled on its own task); recoveries for one service are mutually
//! exclusive via the active set.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{defaults, RecoveryConfig};
use crate::recovery::ledger::{AttemptLedger, RecoveryAttempt};
use crate::recovery::registry::ActionRegistry;
use crate::types::{HealthEvent, HealthStatus, RecoveryEvent};

/// Error context recorded when an operator triggers recovery by hand.
const MANUAL_TRIGGER: &str = "manual trigger";

/// Coordinates bounded automatic remediation for failing services.
///
/// One instance per process, constructed at startup and shared by
/// reference; tests construct fresh instances per test.
pub struct RecoveryCoordinator {
    registry: ActionRegistry,
    ledger: Mutex<AttemptLedger>,
    /// Active-Recovery Set: services currently undergoing remediation.
    /// Std mutex, never held across an await point.
    active: Arc<StdMutex<HashSet<String>>>,
    events: broadcast::Sender<RecoveryEvent>,
    retry_window: Duration,
    stats: Mutex<RecoveryStats>,
}

impl RecoveryCoordinator {
    /// Create a coordinator with its own outbound event channel.
    pub fn new(registry: ActionRegistry, config: &RecoveryConfig) -> Self {
        let (events, _) = broadcast::channel(defaults::RECOVERY_EVENT_CAPACITY);
        Self::with_events(registry, config, events)
    }

    /// Create a coordinator emitting on an existing channel.
    ///
    /// Use this when the registry holds actions that also emit (the builtin
    /// restart-request action), so everything shares one channel.
    pub fn with_events(
        registry: ActionRegistry,
        config: &RecoveryConfig,
        events: broadcast::Sender<RecoveryEvent>,
    ) -> Self {
        info!(
            actions = registry.len(),
            max_history = config.max_history,
            retry_window_secs = config.retry_window_secs,
            "Initializing recovery coordinator"
        );
        Self {
            registry,
            ledger: Mutex::new(AttemptLedger::new(config.max_history)),
            active: Arc::new(StdMutex::new(HashSet::new())),
            events,
            retry_window: Duration::seconds(config.retry_window_secs),
            stats: Mutex::new(RecoveryStats::default()),
        }
    }

    /// Subscribe to terminal recovery events and restart requests.
    pub fn subscribe(&self) -> broadcast::Receiver<RecoveryEvent> {
        self.events.subscribe()
    }

    /// Attempt automatic recovery of `service`.
    ///
    /// Returns `true` if any applicable action succeeded. Returns `false`
    /// for overlap rejection, no applicable actions, or full exhaustion —
    /// the first two are no-op rejections, not failures to escalate; only
    /// exhaustion emits [`RecoveryEvent::Failed`].
    pub async fn attempt_recovery(&self, service: &str, error_context: Option<&str>) -> bool {
        // Exclusive entry guard. Release happens in ActiveGuard::drop on
        // every exit path, including action faults.
        let Some(_guard) = ActiveGuard::try_acquire(&self.active, service) else {
            debug!(service, "Recovery already in progress — rejecting overlap");
            self.stats.lock().await.overlap_rejections += 1;
            return false;
        };

        let actions = self.registry.actions_for(service);
        if actions.is_empty() {
            info!(service, "No recovery actions apply — nothing to do");
            return false;
        }

        self.stats.lock().await.recoveries_attempted += 1;
        info!(
            service,
            candidates = actions.len(),
            error = error_context.unwrap_or("unspecified"),
            "Starting recovery"
        );

        let window_start = Utc::now() - self.retry_window;
        for action in &actions {
            let recent = self
                .ledger
                .lock()
                .await
                .count_matching(service, &action.name, window_start);
            if recent >= action.max_attempts as usize {
                warn!(
                    service,
                    action = %action.name,
                    attempts_in_window = recent,
                    max_attempts = action.max_attempts,
                    "Retry quota reached — skipping action"
                );
                self.stats.lock().await.quota_skips += 1;
                continue;
            }

            debug!(service, action = %action.name, "Executing recovery action");
            let (success, fault) = match action.execute().await {
                Ok(outcome) => (outcome, None),
                Err(e) => (false, Some(format!("{e:#}"))),
            };

            // Recorded unconditionally, in completion order — that order
            // drives eviction and windowed counting.
            self.ledger.lock().await.record(RecoveryAttempt {
                service: service.to_string(),
                action: action.name.clone(),
                timestamp: Utc::now(),
                success,
                error: fault.clone(),
            });

            if success {
                info!(service, action = %action.name, "Recovery succeeded");
                self.stats.lock().await.recoveries_succeeded += 1;
                let _ = self.events.send(RecoveryEvent::Succeeded {
                    service: service.to_string(),
                    action: action.name.clone(),
                });
                return true;
            }

            match fault {
                Some(detail) => warn!(
                    service,
                    action = %action.name,
                    error = %detail,
                    "Recovery action faulted — trying next"
                ),
                None => warn!(
                    service,
                    action = %action.name,
                    "Recovery action did not help — trying next"
                ),
            }
        }

        let error = error_context
            .unwrap_or("all applicable actions exhausted")
            .to_string();
        error!(service, error = %error, "Recovery failed — all applicable actions exhausted");
        self.stats.lock().await.recoveries_failed += 1;
        let _ = self.events.send(RecoveryEvent::Failed {
            service: service.to_string(),
            error,
        });
        false
    }

    /// Operator-triggered recovery. Identical to [`Self::attempt_recovery`]
    /// except the error context is the manual-trigger sentinel.
    pub async fn manual_recovery(&self, service: &str) -> bool {
        info!(service, "Manual recovery requested");
        self.attempt_recovery(service, Some(MANUAL_TRIGGER)).await
    }

    /// Read-only snapshot of retained attempts, most-recent-last.
    pub async fn attempt_history(&self) -> Vec<RecoveryAttempt> {
        self.ledger.lock().await.snapshot()
    }

    /// Retained attempts completed at or after `since`.
    pub async fn attempt_history_since(
        &self,
        since: chrono::DateTime<Utc>,
    ) -> Vec<RecoveryAttempt> {
        self.ledger.lock().await.snapshot_since(since)
    }

    /// Services currently undergoing remediation.
    pub fn active_services(&self) -> Vec<String> {
        let set = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        set.iter().cloned().collect()
    }

    /// Whether a recovery for `service` is in flight right now.
    pub fn is_recovering(&self, service: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(service)
    }

    /// Counters since construction.
    pub async fn stats(&self) -> RecoveryStats {
        self.stats.lock().await.clone()
    }

    /// Consume health-monitor events until the channel closes or `shutdown`
    /// fires. Call from `tokio::spawn`.
    ///
    /// Each event is dispatched on its own task so a recovery suspended on
    /// I/O never delays events for other services; the active set is what
    /// keeps same-service recoveries exclusive.
    pub async fn run(
        self: Arc<Self>,
        mut health_events: mpsc::Receiver<HealthEvent>,
        shutdown: CancellationToken,
    ) {
        info!(actions = self.registry.len(), "Recovery engine started");
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Recovery engine stopping (shutdown requested)");
                    break;
                }
                event = health_events.recv() => {
                    let Some(event) = event else {
                        info!("Health event channel closed — recovery engine stopping");
                        break;
                    };
                    let coordinator = Arc::clone(&self);
                    tokio::spawn(async move {
                        coordinator.handle_event(event).await;
                    });
                }
            }
        }
    }

    /// Apply the subscription rules to one health event.
    ///
    /// Critical failures always trigger recovery; status changes trigger it
    /// only on the `Healthy` → `Degraded` transition (proactive remediation
    /// before full failure).
    pub async fn handle_event(&self, event: HealthEvent) {
        self.stats.lock().await.events_observed += 1;
        match event {
            HealthEvent::CriticalFailure { service, error } => {
                error!(service = %service, error = %error, "Critical failure reported");
                self.attempt_recovery(&service, Some(&error)).await;
            }
            HealthEvent::StatusChange {
                service,
                previous,
                current,
            } => {
                if previous == HealthStatus::Healthy && current == HealthStatus::Degraded {
                    info!(service = %service, "Service degrading — attempting proactive recovery");
                    self.attempt_recovery(&service, Some("status degraded")).await;
                } else {
                    debug!(
                        service = %service,
                        previous = %previous,
                        current = %current,
                        "Status change ignored"
                    );
                }
            }
        }
    }
}

/// RAII membership in the Active-Recovery Set.
///
/// `try_acquire` is the check-then-insert as one atomic unit under the set
/// mutex; `Drop` releases, making the guard exception-safe on every exit
/// path of a recovery flow.
struct ActiveGuard {
    active: Arc<StdMutex<HashSet<String>>>,
    service: String,
}

impl ActiveGuard {
    fn try_acquire(active: &Arc<StdMutex<HashSet<String>>>, service: &str) -> Option<Self> {
        let mut set = active.lock().unwrap_or_else(PoisonError::into_inner);
        if set.insert(service.to_string()) {
            Some(Self {
                active: Arc::clone(active),
                service: service.to_string(),
            })
        } else {
            None
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut set = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        set.remove(&self.service);
    }
}

/// Engine counters since process start.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryStats {
    pub events_observed: u64,
    pub recoveries_attempted: u64,
    pub recoveries_succeeded: u64,
    pub recoveries_failed: u64,
    pub overlap_rejections: u64,
    pub quota_skips: u64,
}

impl std::fmt::Display for RecoveryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Recovery: {} events, {} attempted ({} succeeded, {} failed), {} overlaps rejected, {} quota skips",
            self.events_observed,
            self.recoveries_attempted,
            self.recoveries_succeeded,
            self.recoveries_failed,
            self.overlap_rejections,
            self.quota_skips
        )
    }
}
