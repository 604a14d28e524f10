//! Constants for the quoteline engine
//!
//! Default timings and jitter factors for the background jobs.

// ============================================================================
// WRITE-BEHIND SYNC
// ============================================================================

/// Default interval between reconciliation cycles in seconds
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15;

/// Default lifetime of a staged pending operation in seconds.
/// Must stay above the sync interval or staged work can expire unsynced.
pub const DEFAULT_PENDING_TTL_SECS: u64 = 30;

// ============================================================================
// QUOTE SIMULATOR
// ============================================================================

/// Default interval between simulator ticks in seconds
pub const DEFAULT_SIMULATOR_INTERVAL_SECS: u64 = 2;

/// Default full width of the relative price jitter band (±0.5%)
pub const DEFAULT_PRICE_JITTER: f64 = 0.01;

/// Default full width of the relative volume jitter band (±10%)
pub const DEFAULT_VOLUME_JITTER: f64 = 0.2;

// ============================================================================
// LOGGING
// ============================================================================

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "quoteline_engine=debug,quoteline_storage=debug,info";
