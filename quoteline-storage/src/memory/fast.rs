use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use quoteline_core::FastStoreError;
use tokio::time::Instant;

use crate::traits::FastStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL key-value store held in a process-local map.
///
/// Expiry is evaluated lazily against `tokio::time::Instant`, so tests that
/// pause the tokio clock observe keys expiring as virtual time advances.
/// Expired entries are purged whenever the map is written.
#[derive(Debug, Default)]
pub struct InMemoryFastStore {
    entries: RwLock<HashMap<String, Entry>>,
    failing: AtomicBool,
    failing_gets: RwLock<HashSet<String>>,
    operations: AtomicU64,
}

impl InMemoryFastStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `Unavailable` until reset.
    pub fn fail_operations(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make `get` fail for one key only, leaving every other operation intact.
    pub fn fail_gets_for(&self, key: &str, failing: bool) {
        if let Ok(mut set) = self.failing_gets.write() {
            if failing {
                set.insert(key.to_string());
            } else {
                set.remove(key);
            }
        }
    }

    /// Number of operations attempted so far, failed ones included.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time-to-live of a live key.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now)
    }

    fn begin(&self, op: &str, key: &str) -> Result<(), FastStoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FastStoreError::Unavailable {
                reason: format!("injected failure on {} {}", op, key),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FastStore for InMemoryFastStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), FastStoreError> {
        self.begin("set", key)?;
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| FastStoreError::LockPoisoned)?;
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FastStoreError> {
        self.begin("get", key)?;
        let key_failing = self
            .failing_gets
            .read()
            .map_err(|_| FastStoreError::LockPoisoned)?
            .contains(key);
        if key_failing {
            return Err(FastStoreError::OperationFailed {
                op: "get".to_string(),
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let now = Instant::now();
        let entries = self
            .entries
            .read()
            .map_err(|_| FastStoreError::LockPoisoned)?;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), FastStoreError> {
        self.begin("delete", key)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| FastStoreError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, FastStoreError> {
        self.begin("keys", prefix)?;
        let now = Instant::now();
        let entries = self
            .entries
            .read()
            .map_err(|_| FastStoreError::LockPoisoned)?;
        Ok(entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
