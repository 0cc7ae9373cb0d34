//! Recovery actions — the unit of remediation.
//!
//! A [`RecoveryAction`] pairs a static descriptor (name, services it
//! applies to, attempt quota) with a [`Remedy`], the narrow asynchronous
//! operation that actually touches a subsystem.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// One remediation operation against one subsystem.
///
/// Return contract:
/// - `Ok(true)` — the subsystem was remediated.
/// - `Ok(false)` — the operation ran but did not help (natural failure).
/// - `Err(_)` — the operation faulted. The coordinator catches this,
///   records it as a failed attempt with the error detail, and moves on;
///   it is never propagated to the caller of a recovery.
#[async_trait]
pub trait Remedy: Send + Sync {
    async fn execute(&self) -> anyhow::Result<bool>;
}

/// Adapter building a [`Remedy`] from a plain async closure.
///
/// Keeps one-off remedies (and test doubles) from each needing a struct:
///
/// ```ignore
/// let remedy = FnRemedy::new(|| async { Ok(true) });
/// ```
pub struct FnRemedy<F> {
    f: F,
}

impl<F> FnRemedy<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Remedy for FnRemedy<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    async fn execute(&self) -> anyhow::Result<bool> {
        (self.f)().await
    }
}

/// A named, quota-limited remediation scoped to one or more services.
///
/// Immutable after registration. Registry order, not any field here,
/// determines priority among the actions applicable to a service.
#[derive(Clone)]
pub struct RecoveryAction {
    /// Unique identifier, recorded on every attempt.
    pub name: String,
    /// Human-readable summary for operator surfaces.
    pub description: String,
    /// Services this action can remediate.
    pub applies_to: HashSet<String>,
    /// Maximum executions per `(service, action)` within the retry window.
    pub max_attempts: u32,
    remedy: Arc<dyn Remedy>,
}

impl RecoveryAction {
    pub fn new<S, I>(
        name: impl Into<String>,
        description: impl Into<String>,
        applies_to: I,
        max_attempts: u32,
        remedy: Arc<dyn Remedy>,
    ) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            applies_to: applies_to.into_iter().map(Into::into).collect(),
            max_attempts,
            remedy,
        }
    }

    /// Whether this action can remediate the given service.
    pub fn applies_to(&self, service: &str) -> bool {
        self.applies_to.contains(service)
    }

    /// Run the remedy. Fault handling is the coordinator's job.
    pub(crate) async fn execute(&self) -> anyhow::Result<bool> {
        self.remedy.execute().await
    }
}

impl std::fmt::Debug for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryAction")
            .field("name", &self.name)
            .field("applies_to", &self.applies_to)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
