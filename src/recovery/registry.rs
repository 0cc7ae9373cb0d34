//! Action Registry — static, ordered catalog of remediation actions.
//!
//! Registry order IS remediation priority: actions for a service are
//! attempted front to back, most specific / least destructive first,
//! escalating to the restart-request signal last. The catalog is fixed for
//! the process lifetime.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::{defaults, RecoveryConfig};
use crate::recovery::action::{RecoveryAction, Remedy};
use crate::subsystems::{CredentialStore, DatabaseProbe, MemoryReclaimer};
use crate::types::RecoveryEvent;

/// Service identifiers the builtin catalog remediates.
pub mod services {
    pub const DATABASE: &str = "database";
    pub const MEMORY: &str = "memory";
    pub const EXTERNAL_API: &str = "external_api";
}

/// Read-only ordered sequence of [`RecoveryAction`]s.
///
/// Actions may overlap in `applies_to`; a service legitimately has several
/// candidate actions, tried in registry order.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<RecoveryAction>>,
}

impl ActionRegistry {
    /// Build a registry from actions in priority order.
    pub fn new(actions: Vec<RecoveryAction>) -> Self {
        Self {
            actions: actions.into_iter().map(Arc::new).collect(),
        }
    }

    /// All actions applicable to `service`, preserving registry order.
    pub fn actions_for(&self, service: &str) -> Vec<Arc<RecoveryAction>> {
        self.actions
            .iter()
            .filter(|a| a.applies_to(service))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RecoveryAction>> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The standard catalog: database reconnect, memory reclaim, credential
    /// rotation, then the restart-request signal for every service.
    ///
    /// `events` is the same outbound channel the coordinator emits terminal
    /// events on; the restart action uses it to signal an external process
    /// supervisor. It never restarts anything itself.
    pub fn builtin(
        database: Arc<dyn DatabaseProbe>,
        memory: Arc<dyn MemoryReclaimer>,
        credentials: Arc<dyn CredentialStore>,
        events: broadcast::Sender<RecoveryEvent>,
        config: &RecoveryConfig,
    ) -> Self {
        Self::new(vec![
            RecoveryAction::new(
                "reconnect_database",
                "Run a trivial query to force the database client to re-establish its connection",
                [services::DATABASE],
                config.default_max_attempts,
                Arc::new(ReconnectDatabase { probe: database }),
            ),
            RecoveryAction::new(
                "reclaim_memory",
                "Request a collection / cache-trim pass to relieve memory pressure",
                [services::MEMORY],
                defaults::MEMORY_RECLAIM_MAX_ATTEMPTS,
                Arc::new(ReclaimMemory { reclaimer: memory }),
            ),
            RecoveryAction::new(
                "rotate_api_credential",
                "Swap the exhausted external-API credential for the standby key",
                [services::EXTERNAL_API],
                defaults::CREDENTIAL_ROTATE_MAX_ATTEMPTS,
                Arc::new(RotateApiCredential { store: credentials }),
            ),
            RecoveryAction::new(
                "request_restart",
                "Signal the external process supervisor that a restart is warranted",
                [services::DATABASE, services::MEMORY, services::EXTERNAL_API],
                defaults::RESTART_REQUEST_MAX_ATTEMPTS,
                Arc::new(RequestRestart { events }),
            ),
        ])
    }
}

// ============================================================================
// Builtin remedies
// ============================================================================

struct ReconnectDatabase {
    probe: Arc<dyn DatabaseProbe>,
}

#[async_trait]
impl Remedy for ReconnectDatabase {
    async fn execute(&self) -> anyhow::Result<bool> {
        self.probe.ping().await?;
        info!("Database probe succeeded — connection re-established");
        Ok(true)
    }
}

struct ReclaimMemory {
    reclaimer: Arc<dyn MemoryReclaimer>,
}

#[async_trait]
impl Remedy for ReclaimMemory {
    async fn execute(&self) -> anyhow::Result<bool> {
        let freed = self.reclaimer.reclaim().await?;
        info!(freed_bytes = freed, "Memory reclaim pass completed");
        Ok(true)
    }
}

struct RotateApiCredential {
    store: Arc<dyn CredentialStore>,
}

#[async_trait]
impl Remedy for RotateApiCredential {
    async fn execute(&self) -> anyhow::Result<bool> {
        self.store.rotate().await
    }
}

struct RequestRestart {
    events: broadcast::Sender<RecoveryEvent>,
}

#[async_trait]
impl Remedy for RequestRestart {
    async fn execute(&self) -> anyhow::Result<bool> {
        warn!("Less destructive remediations exhausted — requesting external restart");
        // Send failure means nobody is listening; the signal is advisory.
        let _ = self.events.send(RecoveryEvent::RestartRequested {
            reason: "automatic recovery exhausted less destructive remediations".to_string(),
        });
        Ok(true)
    }
}
