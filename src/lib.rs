//! selfheal: bounded automatic remediation for failing subsystems
//!
//! A process-wide recovery engine that reacts to health-state signals from
//! an external health monitor and attempts bounded, automatic remediation
//! of failing subsystems (database connectivity, memory pressure,
//! external-API credential exhaustion) without operator intervention.
//!
//! ## Architecture
//!
//! - **Action Registry**: static catalog of remediation actions, ordered by
//!   priority, quota-limited per service
//! - **Recovery Coordinator**: event-driven selection and execution with
//!   per-service mutual exclusion
//! - **Attempt Ledger**: bounded FIFO history backing the sliding-window
//!   retry quota and diagnostics
//!
//! ## Wiring
//!
//! ```ignore
//! let config = RecoveryConfig::load();
//! let (events, _) = broadcast::channel(defaults::RECOVERY_EVENT_CAPACITY);
//! let registry = ActionRegistry::builtin(db, memory, credentials, events.clone(), &config);
//! let coordinator = Arc::new(RecoveryCoordinator::with_events(registry, &config, events));
//!
//! let (health_tx, health_rx) = mpsc::channel(defaults::HEALTH_EVENT_BUFFER);
//! tokio::spawn(Arc::clone(&coordinator).run(health_rx, shutdown.clone()));
//! ```
//!
//! The engine exposes no network surface; it signals the outside world only
//! through `RecoveryEvent`s on its broadcast channel.

pub mod config;
pub mod recovery;
pub mod subsystems;
pub mod types;

// Re-export configuration
pub use config::RecoveryConfig;

// Re-export commonly used types
pub use types::{HealthEvent, HealthStatus, RecoveryEvent};

// Re-export engine components
pub use recovery::{
    ActionRegistry, AttemptLedger, FnRemedy, RecoveryAction, RecoveryAttempt,
    RecoveryCoordinator, RecoveryStats, Remedy,
};

// Re-export capability seams
pub use subsystems::{CredentialStore, DatabaseProbe, EnvCredentialStore, MemoryReclaimer};
