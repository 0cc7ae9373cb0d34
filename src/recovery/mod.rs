//! Self-healing recovery engine.
//!
//! Three cooperating parts:
//!
//! - [`ActionRegistry`] — static catalog of remediation actions, ordered by
//!   priority, each scoped to the services it applies to and quota-limited.
//! - [`RecoveryCoordinator`] — reacts to health events, enforces the
//!   per-service exclusivity guard and the sliding-window retry quota,
//!   executes actions in order until one succeeds, and emits terminal
//!   events for an external supervisor.
//! - [`AttemptLedger`] — bounded, time-queryable history of past attempts,
//!   backing both the quota and operator diagnostics.

pub mod action;
pub mod coordinator;
pub mod ledger;
pub mod registry;

pub use action::{FnRemedy, RecoveryAction, Remedy};
pub use coordinator::{RecoveryCoordinator, RecoveryStats};
pub use ledger::{AttemptLedger, RecoveryAttempt};
pub use registry::{services, ActionRegistry};
