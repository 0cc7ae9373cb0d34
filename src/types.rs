//! Shared types — health signals in, recovery outcomes out.
//!
//! The engine sits between an external health monitor (inbound
//! [`HealthEvent`]s) and whatever supervises the process (outbound
//! [`RecoveryEvent`]s). Both sides are plain data over channels; neither
//! carries behavior.

use serde::{Deserialize, Serialize};

/// Component health status as reported by the external health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Component is operating normally
    Healthy,
    /// Component is running but with reduced capability
    Degraded,
    /// Component is not operational
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

/// Inbound event from the health monitor.
///
/// The engine never decides *when* a service is unhealthy — that is the
/// monitor's job. It only reacts to what arrives on this channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthEvent {
    /// A service failed outright; recovery is always attempted.
    CriticalFailure { service: String, error: String },
    /// A service changed status. Only the `Healthy` → `Degraded` transition
    /// triggers recovery (proactive remediation before full failure).
    StatusChange {
        service: String,
        previous: HealthStatus,
        current: HealthStatus,
    },
}

/// Outbound event for an external supervisor (process manager, pager).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryEvent {
    /// One action remediated the service; no further actions were tried.
    Succeeded { service: String, action: String },
    /// All applicable actions were tried or quota-skipped without success.
    /// Escalation beyond this point is the supervisor's call.
    Failed { service: String, error: String },
    /// The last-resort registry action determined a restart is warranted.
    /// Nothing in this process performs the restart itself.
    RestartRequested { reason: String },
}

impl std::fmt::Display for RecoveryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryEvent::Succeeded { service, action } => {
                write!(f, "recovery_success: {service} via {action}")
            }
            RecoveryEvent::Failed { service, error } => {
                write!(f, "recovery_failed: {service} ({error})")
            }
            RecoveryEvent::RestartRequested { reason } => {
                write!(f, "restart_requested: {reason}")
            }
        }
    }
}
