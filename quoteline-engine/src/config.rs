//! Engine Configuration Module
//!
//! Timings for the write-behind synchronizer, the aggregate read cache, and
//! the quote simulator. Configuration is loaded from `QUOTELINE_*`
//! environment variables with defaults from [`crate::constants`]; values that
//! fail to parse fall back to the default.

use std::time::Duration;

use quoteline_core::ConfigError;
use quoteline_storage::AggregateCacheConfig;

use crate::constants::{
    DEFAULT_PENDING_TTL_SECS, DEFAULT_PRICE_JITTER, DEFAULT_SIMULATOR_INTERVAL_SECS,
    DEFAULT_SYNC_INTERVAL_SECS, DEFAULT_VOLUME_JITTER,
};
use quoteline_storage::cache::aggregate::DEFAULT_AGGREGATE_TTL_SECS;

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|s| match s.trim().to_lowercase().as_str() {
            "false" | "0" | "no" | "off" => false,
            "true" | "1" | "yes" | "on" => true,
            _ => default,
        })
        .unwrap_or(default)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// WRITE-BEHIND SYNC
// ============================================================================

/// Configuration for staging and reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// How often the reconciliation job sweeps pending keys (default: 15 seconds)
    pub tick_interval: Duration,

    /// Lifetime of a staged pending operation (default: 30 seconds).
    /// Must exceed `tick_interval`.
    pub pending_ttl: Duration,

    /// Whether to log each pending key that fails to apply (default: true)
    pub log_failures: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            pending_ttl: Duration::from_secs(DEFAULT_PENDING_TTL_SECS),
            log_failures: true,
        }
    }
}

impl SyncConfig {
    /// Create SyncConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `QUOTELINE_SYNC_INTERVAL_SECS`: Reconciliation interval (default: 15)
    /// - `QUOTELINE_PENDING_TTL_SECS`: Pending operation TTL (default: 30)
    /// - `QUOTELINE_SYNC_LOG_FAILURES`: Log per-key failures (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            tick_interval: Duration::from_secs(parse_or(
                &lookup,
                "QUOTELINE_SYNC_INTERVAL_SECS",
                DEFAULT_SYNC_INTERVAL_SECS,
            )),
            pending_ttl: Duration::from_secs(parse_or(
                &lookup,
                "QUOTELINE_PENDING_TTL_SECS",
                DEFAULT_PENDING_TTL_SECS,
            )),
            log_failures: flag_or(&lookup, "QUOTELINE_SYNC_LOG_FAILURES", true),
        }
    }

    /// Create a configuration for development/testing with short timings.
    pub fn development() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            pending_ttl: Duration::from_secs(10),
            log_failures: true,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_pending_ttl(mut self, pending_ttl: Duration) -> Self {
        self.pending_ttl = pending_ttl;
        self
    }

    pub fn with_log_failures(mut self, log_failures: bool) -> Self {
        self.log_failures = log_failures;
        self
    }

    /// Check timings. A pending TTL at or below the tick interval lets staged
    /// operations expire before any sweep can apply them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_zero("sync.tick_interval", self.tick_interval)?;
        require_non_zero("sync.pending_ttl", self.pending_ttl)?;
        if self.pending_ttl <= self.tick_interval {
            return Err(ConfigError::TtlNotAboveInterval {
                ttl: self.pending_ttl,
                interval: self.tick_interval,
            });
        }
        Ok(())
    }
}

// ============================================================================
// QUOTE SIMULATOR
// ============================================================================

/// Configuration for the quote simulator job.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// How often quotes are perturbed (default: 2 seconds)
    pub tick_interval: Duration,

    /// Full width of the relative price band; 0.01 means ±0.5% (default: 0.01)
    pub price_jitter: f64,

    /// Full width of the relative volume band; 0.2 means ±10% (default: 0.2)
    pub volume_jitter: f64,

    /// Whether the engine starts the simulator at all (default: true)
    pub enabled: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_SIMULATOR_INTERVAL_SECS),
            price_jitter: DEFAULT_PRICE_JITTER,
            volume_jitter: DEFAULT_VOLUME_JITTER,
            enabled: true,
        }
    }
}

impl SimulatorConfig {
    /// Create SimulatorConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `QUOTELINE_SIMULATOR_INTERVAL_SECS`: Tick interval (default: 2)
    /// - `QUOTELINE_PRICE_JITTER`: Price band width (default: 0.01)
    /// - `QUOTELINE_VOLUME_JITTER`: Volume band width (default: 0.2)
    /// - `QUOTELINE_SIMULATOR_ENABLED`: Run the simulator (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            tick_interval: Duration::from_secs(parse_or(
                &lookup,
                "QUOTELINE_SIMULATOR_INTERVAL_SECS",
                DEFAULT_SIMULATOR_INTERVAL_SECS,
            )),
            price_jitter: parse_or(&lookup, "QUOTELINE_PRICE_JITTER", DEFAULT_PRICE_JITTER),
            volume_jitter: parse_or(&lookup, "QUOTELINE_VOLUME_JITTER", DEFAULT_VOLUME_JITTER),
            enabled: flag_or(&lookup, "QUOTELINE_SIMULATOR_ENABLED", true),
        }
    }

    /// Create a configuration for development with a fast tick.
    pub fn development() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            ..Self::default()
        }
    }

    /// A configuration that never starts the simulator.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_price_jitter(mut self, price_jitter: f64) -> Self {
        self.price_jitter = price_jitter;
        self
    }

    pub fn with_volume_jitter(mut self, volume_jitter: f64) -> Self {
        self.volume_jitter = volume_jitter;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_zero("simulator.tick_interval", self.tick_interval)?;
        require_jitter("simulator.price_jitter", self.price_jitter)?;
        require_jitter("simulator.volume_jitter", self.volume_jitter)?;
        Ok(())
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Full configuration for an [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub sync: SyncConfig,
    pub cache: AggregateCacheConfig,
    pub simulator: SimulatorConfig,
    /// Redis URL for the fast store; in-memory when absent.
    pub redis_url: Option<String>,
}

impl EngineConfig {
    /// Create EngineConfig from environment variables.
    ///
    /// Reads everything [`SyncConfig::from_env`] and
    /// [`SimulatorConfig::from_env`] read, plus:
    /// - `QUOTELINE_CACHE_TTL_SECS`: Aggregate cache TTL (default: 30)
    /// - `QUOTELINE_REDIS_URL`: Redis connection URL (default: unset)
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cache_ttl = parse_or(&lookup, "QUOTELINE_CACHE_TTL_SECS", DEFAULT_AGGREGATE_TTL_SECS);
        Self {
            sync: SyncConfig::from_lookup(&lookup),
            cache: AggregateCacheConfig::new().with_ttl(Duration::from_secs(cache_ttl)),
            simulator: SimulatorConfig::from_lookup(&lookup),
            redis_url: lookup("QUOTELINE_REDIS_URL").filter(|s| !s.trim().is_empty()),
        }
    }

    /// Create a configuration for development with short timings.
    pub fn development() -> Self {
        Self {
            sync: SyncConfig::development(),
            cache: AggregateCacheConfig::new().with_ttl(Duration::from_secs(10)),
            simulator: SimulatorConfig::development(),
            redis_url: None,
        }
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_cache(mut self, cache: AggregateCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        require_non_zero("cache.ttl", self.cache.ttl)?;
        self.simulator.validate()?;
        Ok(())
    }
}

fn require_non_zero(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", value),
            reason: "must be non-zero".to_string(),
        });
    }
    Ok(())
}

fn require_jitter(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be a finite factor in [0, 1)".to_string(),
        });
    }
    Ok(())
}
