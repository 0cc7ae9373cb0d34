//! Capability seams for the subsystems recovery actions touch.
//!
//! Each trait covers exactly one narrow operation ("run a trivial query",
//! "request a collection pass", "swap to the standby credential"). The
//! engine treats every implementation as opaque: the only thing that
//! matters is whether the operation succeeded.
//!
//! Hosts implement these against their real clients; tests implement them
//! with scripted doubles.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the environment-backed credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Standby credential variable {0} is not valid unicode")]
    InvalidStandby(String),
}

/// Database connectivity, reduced to a liveness probe.
///
/// A successful `ping` means the client either had a live connection or
/// re-established one as a side effect of the trivial query.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Memory-pressure relief: request a collection or cache-trim pass.
#[async_trait]
pub trait MemoryReclaimer: Send + Sync {
    /// Returns an estimate of bytes reclaimed, when the runtime reports one.
    async fn reclaim(&self) -> anyhow::Result<u64>;
}

/// External-API credential management, reduced to one operation: swap the
/// active credential for a standby.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns `false` when no standby credential remains to rotate to —
    /// a natural failure, not a fault.
    async fn rotate(&self) -> anyhow::Result<bool>;
}

/// [`CredentialStore`] over process environment variables.
///
/// The active key lives in one variable, the standby in another; rotation
/// copies the standby over the active slot so provider SDK factories that
/// read the environment at request time pick up the fresh key.
pub struct EnvCredentialStore {
    active_var: String,
    standby_var: String,
}

impl EnvCredentialStore {
    pub fn new(active_var: impl Into<String>, standby_var: impl Into<String>) -> Self {
        Self {
            active_var: active_var.into(),
            standby_var: standby_var.into(),
        }
    }
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn rotate(&self) -> anyhow::Result<bool> {
        let standby = match std::env::var(&self.standby_var) {
            Ok(value) if !value.is_empty() => value,
            Ok(_) | Err(std::env::VarError::NotPresent) => {
                warn!(
                    standby_var = %self.standby_var,
                    "No standby credential configured — cannot rotate"
                );
                return Ok(false);
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(CredentialError::InvalidStandby(self.standby_var.clone()).into());
            }
        };

        std::env::set_var(&self.active_var, &standby);
        info!(
            active_var = %self.active_var,
            standby_var = %self.standby_var,
            "Rotated active credential to standby"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rotate_swaps_standby_into_active_slot() {
        std::env::set_var("SELFHEAL_TEST_ACTIVE", "worn-out-key");
        std::env::set_var("SELFHEAL_TEST_STANDBY", "fresh-key");

        let store = EnvCredentialStore::new("SELFHEAL_TEST_ACTIVE", "SELFHEAL_TEST_STANDBY");
        assert!(store.rotate().await.unwrap());
        assert_eq!(
            std::env::var("SELFHEAL_TEST_ACTIVE").unwrap(),
            "fresh-key"
        );
    }

    #[tokio::test]
    async fn rotate_without_standby_is_natural_failure() {
        std::env::remove_var("SELFHEAL_TEST_MISSING_STANDBY");

        let store =
            EnvCredentialStore::new("SELFHEAL_TEST_ACTIVE_2", "SELFHEAL_TEST_MISSING_STANDBY");
        assert!(!store.rotate().await.unwrap());
    }
}
