//! Engine-wide default constants.
//!
//! These are compile-time policy knobs, not request-scoped parameters.
//! A TOML file (see [`RecoveryConfig`](super::RecoveryConfig)) may override
//! the bounded-history and retry-window values; the per-action attempt
//! quotas of the builtin catalog live here.

// ============================================================================
// Attempt Ledger
// ============================================================================

/// Maximum retained recovery attempts, globally across all services.
///
/// FIFO eviction by insertion order once exceeded.
pub const MAX_HISTORY: usize = 50;

// ============================================================================
// Retry quota
// ============================================================================

/// Trailing window over which a `(service, action)` attempt count is
/// limited (seconds). Wall-clock based so quotas survive short process
/// pauses and roll over hourly.
pub const RETRY_WINDOW_SECS: i64 = 3_600;

/// Default attempt quota for actions that do not specify their own
/// (the builtin database reconnect uses this).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Builtin action quotas
// ============================================================================

/// Attempts allowed per hour for the memory reclaim action.
pub const MEMORY_RECLAIM_MAX_ATTEMPTS: u32 = 2;

/// Attempts allowed per hour for the credential rotation action.
pub const CREDENTIAL_ROTATE_MAX_ATTEMPTS: u32 = 2;

/// Attempts allowed per hour for the restart-request action.
///
/// One per window: once the supervisor has been signalled, repeating the
/// signal adds nothing.
pub const RESTART_REQUEST_MAX_ATTEMPTS: u32 = 1;

// ============================================================================
// Channels
// ============================================================================

/// Buffer size for the inbound health-event channel.
pub const HEALTH_EVENT_BUFFER: usize = 100;

/// Capacity of the outbound broadcast channel for recovery events.
pub const RECOVERY_EVENT_CAPACITY: usize = 64;
