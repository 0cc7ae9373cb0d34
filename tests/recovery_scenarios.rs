//! Recovery Engine Scenario Tests
//!
//! End-to-end exercises of the coordinator / registry / ledger triad:
//! mutual exclusion, quota enforcement, first-success-wins ordering,
//! ledger bounds, and cross-service isolation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};

use selfheal::config::defaults;
use selfheal::{
    ActionRegistry, CredentialStore, DatabaseProbe, FnRemedy, MemoryReclaimer, RecoveryAction,
    RecoveryConfig, RecoveryCoordinator, RecoveryEvent,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn fixed_action(
    name: &str,
    services: &[&str],
    max_attempts: u32,
    succeeds: bool,
    calls: Arc<AtomicU32>,
) -> RecoveryAction {
    RecoveryAction::new(
        name,
        "test action",
        services.iter().copied(),
        max_attempts,
        Arc::new(FnRemedy::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(succeeds)
            }
        })),
    )
}

// ============================================================================
// Scenario 1: single action succeeds
// ============================================================================

#[tokio::test]
async fn successful_action_records_and_emits_once() {
    init_tracing();
    let calls = Arc::new(AtomicU32::new(0));
    let registry = ActionRegistry::new(vec![fixed_action(
        "reconnect_database",
        &["database"],
        3,
        true,
        Arc::clone(&calls),
    )]);
    let coordinator = RecoveryCoordinator::new(registry, &RecoveryConfig::default());
    let mut events = coordinator.subscribe();

    assert!(coordinator.attempt_recovery("database", None).await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let history = coordinator.attempt_history().await;
    assert_eq!(history.len(), 1);
    assert!(history[0].success);
    assert_eq!(history[0].service, "database");
    assert_eq!(history[0].action, "reconnect_database");
    assert!(history[0].error.is_none());

    match events.recv().await.unwrap() {
        RecoveryEvent::Succeeded { service, action } => {
            assert_eq!(service, "database");
            assert_eq!(action, "reconnect_database");
        }
        other => panic!("expected Succeeded, got {other:?}"),
    }

    assert!(coordinator.active_services().is_empty());

    // The time-filtered view sees the fresh attempt too.
    let hour_ago = chrono::Utc::now() - chrono::Duration::hours(1);
    assert_eq!(coordinator.attempt_history_since(hour_ago).await.len(), 1);
}

// ============================================================================
// Scenario 2: quota stops the fourth attempt
// ============================================================================

#[tokio::test]
async fn quota_skips_execution_after_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let registry = ActionRegistry::new(vec![fixed_action(
        "reconnect_database",
        &["database"],
        3,
        false,
        Arc::clone(&calls),
    )]);
    let coordinator = RecoveryCoordinator::new(registry, &RecoveryConfig::default());

    for _ in 0..3 {
        assert!(!coordinator.attempt_recovery("database", None).await);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.attempt_history().await.len(), 3);

    // Fourth call: quota reached, action neither executes nor records.
    assert!(!coordinator.attempt_recovery("database", None).await);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.attempt_history().await.len(), 3);
}

// ============================================================================
// Scenario 3: first success wins
// ============================================================================

#[tokio::test]
async fn second_action_succeeds_after_first_fails() {
    let first_calls = Arc::new(AtomicU32::new(0));
    let second_calls = Arc::new(AtomicU32::new(0));
    let registry = ActionRegistry::new(vec![
        fixed_action("trim_caches", &["memory"], 3, false, Arc::clone(&first_calls)),
        fixed_action("reclaim_memory", &["memory"], 3, true, Arc::clone(&second_calls)),
    ]);
    let coordinator = RecoveryCoordinator::new(registry, &RecoveryConfig::default());
    let mut events = coordinator.subscribe();

    assert!(coordinator.attempt_recovery("memory", None).await);

    let history = coordinator.attempt_history().await;
    assert_eq!(history.len(), 2);
    assert!(!history[0].success);
    assert_eq!(history[0].action, "trim_caches");
    assert!(history[1].success);
    assert_eq!(history[1].action, "reclaim_memory");

    // Exactly one terminal event.
    assert!(matches!(
        events.try_recv().unwrap(),
        RecoveryEvent::Succeeded { .. }
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn later_actions_never_run_after_a_success() {
    let early = Arc::new(AtomicU32::new(0));
    let late = Arc::new(AtomicU32::new(0));
    let registry = ActionRegistry::new(vec![
        fixed_action("first", &["database"], 3, true, Arc::clone(&early)),
        fixed_action("request_restart", &["database"], 1, true, Arc::clone(&late)),
    ]);
    let coordinator = RecoveryCoordinator::new(registry, &RecoveryConfig::default());

    assert!(coordinator.attempt_recovery("database", None).await);
    assert_eq!(early.load(Ordering::SeqCst), 1);
    assert_eq!(late.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Scenario 4: overlap rejection while an action is suspended
// ============================================================================

#[tokio::test]
async fn concurrent_recovery_for_same_service_is_rejected() {
    init_tracing();
    let release = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());

    let release_remedy = Arc::clone(&release);
    let started_remedy = Arc::clone(&started);
    let registry = ActionRegistry::new(vec![RecoveryAction::new(
        "slow_flush",
        "suspends until released",
        ["cache"],
        3,
        Arc::new(FnRemedy::new(move || {
            let release = Arc::clone(&release_remedy);
            let started = Arc::clone(&started_remedy);
            async move {
                started.notify_one();
                release.notified().await;
                Ok(true)
            }
        })),
    )]);
    let coordinator = Arc::new(RecoveryCoordinator::new(
        registry,
        &RecoveryConfig::default(),
    ));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.attempt_recovery("cache", None).await })
    };
    started.notified().await;
    assert!(coordinator.is_recovering("cache"));

    // Second call returns false instantly, records nothing.
    assert!(!coordinator.attempt_recovery("cache", None).await);
    assert!(coordinator.attempt_history().await.is_empty());

    release.notify_one();
    assert!(first.await.unwrap());
    assert!(!coordinator.is_recovering("cache"));
    assert_eq!(coordinator.attempt_history().await.len(), 1);
    assert_eq!(coordinator.stats().await.overlap_rejections, 1);
}

// ============================================================================
// Scenario 5: global ledger bound
// ============================================================================

#[tokio::test]
async fn ledger_holds_at_most_fifty_attempts_globally() {
    let mut actions = Vec::new();
    for i in 0..55 {
        let service = format!("svc_{i}");
        actions.push(fixed_action(
            &format!("act_{i}"),
            &[service.as_str()],
            3,
            true,
            Arc::new(AtomicU32::new(0)),
        ));
    }
    let coordinator = RecoveryCoordinator::new(
        ActionRegistry::new(actions),
        &RecoveryConfig::default(),
    );

    for i in 0..55 {
        assert!(coordinator.attempt_recovery(&format!("svc_{i}"), None).await);
    }

    let history = coordinator.attempt_history().await;
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].service, "svc_5");
    assert_eq!(history[49].service, "svc_54");
    let services: Vec<_> = history.iter().map(|a| a.service.as_str()).collect();
    for evicted in 0..5 {
        assert!(!services.contains(&format!("svc_{evicted}").as_str()));
    }
}

// ============================================================================
// P5: unaffected services stay untouched
// ============================================================================

#[tokio::test]
async fn recovery_for_one_service_never_touches_another() {
    let db_calls = Arc::new(AtomicU32::new(0));
    let mem_calls = Arc::new(AtomicU32::new(0));
    let registry = ActionRegistry::new(vec![
        fixed_action("reconnect_database", &["database"], 3, false, Arc::clone(&db_calls)),
        fixed_action("reclaim_memory", &["memory"], 3, true, Arc::clone(&mem_calls)),
    ]);
    let coordinator = RecoveryCoordinator::new(registry, &RecoveryConfig::default());
    let mut events = coordinator.subscribe();

    assert!(!coordinator.attempt_recovery("database", Some("probe timeout")).await);

    assert_eq!(mem_calls.load(Ordering::SeqCst), 0);
    assert!(coordinator
        .attempt_history()
        .await
        .iter()
        .all(|a| a.service == "database"));
    assert!(!coordinator.is_recovering("memory"));
    while let Ok(event) = events.try_recv() {
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("memory"), "event references wrong service: {json}");
    }
}

// ============================================================================
// Exhaustion reporting
// ============================================================================

#[tokio::test]
async fn exhaustion_emits_failed_with_original_error_context() {
    let registry = ActionRegistry::new(vec![fixed_action(
        "reconnect_database",
        &["database"],
        3,
        false,
        Arc::new(AtomicU32::new(0)),
    )]);
    let coordinator = RecoveryCoordinator::new(registry, &RecoveryConfig::default());
    let mut events = coordinator.subscribe();

    assert!(
        !coordinator
            .attempt_recovery("database", Some("connection pool drained"))
            .await
    );
    match events.recv().await.unwrap() {
        RecoveryEvent::Failed { service, error } => {
            assert_eq!(service, "database");
            assert_eq!(error, "connection pool drained");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

// ============================================================================
// Builtin catalog escalation
// ============================================================================

struct FailingProbe;
#[async_trait]
impl DatabaseProbe for FailingProbe {
    async fn ping(&self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

struct NoopReclaimer;
#[async_trait]
impl MemoryReclaimer for NoopReclaimer {
    async fn reclaim(&self) -> anyhow::Result<u64> {
        Ok(4096)
    }
}

struct EmptyStore;
#[async_trait]
impl CredentialStore for EmptyStore {
    async fn rotate(&self) -> anyhow::Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn builtin_catalog_escalates_to_restart_request() {
    init_tracing();
    let (events, mut receiver) = broadcast::channel(defaults::RECOVERY_EVENT_CAPACITY);
    let registry = ActionRegistry::builtin(
        Arc::new(FailingProbe),
        Arc::new(NoopReclaimer),
        Arc::new(EmptyStore),
        events.clone(),
        &RecoveryConfig::default(),
    );
    let coordinator =
        RecoveryCoordinator::with_events(registry, &RecoveryConfig::default(), events);

    // Probe faults, so recovery falls through to the restart signal, which
    // reports success: the engine's job ends at signalling the supervisor.
    assert!(coordinator.attempt_recovery("database", None).await);

    let history = coordinator.attempt_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, "reconnect_database");
    assert!(!history[0].success);
    assert!(history[0].error.as_deref().unwrap_or("").contains("connection refused"));
    assert_eq!(history[1].action, "request_restart");
    assert!(history[1].success);

    assert!(matches!(
        receiver.recv().await.unwrap(),
        RecoveryEvent::RestartRequested { .. }
    ));
    assert!(matches!(
        receiver.recv().await.unwrap(),
        RecoveryEvent::Succeeded { .. }
    ));
}
