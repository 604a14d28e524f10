//! Redis-backed fast store.

use std::time::Duration;

use async_trait::async_trait;
use quoteline_core::FastStoreError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::traits::FastStore;

/// Fast store on top of a Redis connection manager.
///
/// The manager reconnects on its own, so a clone of it is used per call.
/// Prefix enumeration uses `KEYS`, which scans the whole keyspace and is
/// only appropriate for the small pending sets this crate stages.
#[derive(Clone)]
pub struct RedisFastStore {
    conn: ConnectionManager,
}

impl RedisFastStore {
    /// Connect to `url` (for example `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, FastStoreError> {
        let client = redis::Client::open(url).map_err(|e| FastStoreError::Unavailable {
            reason: format!("invalid redis url {}: {}", url, e),
        })?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| FastStoreError::Unavailable {
                reason: e.to_string(),
            })?;
        tracing::info!(%url, "Connected to redis fast store");
        Ok(Self { conn })
    }
}

/// Build a `KEYS` glob matching everything under `prefix`, escaping glob syntax.
pub(crate) fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl FastStore for RedisFastStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), FastStoreError> {
        let mut conn = self.conn.clone();
        // PX rejects zero, so sub-millisecond TTLs round up.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let (): () = conn
            .pset_ex(key, value, millis)
            .await
            .map_err(|e| FastStoreError::operation("set", key, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FastStoreError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| FastStoreError::operation("get", key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), FastStoreError> {
        let mut conn = self.conn.clone();
        let (): () = conn
            .del(key)
            .await
            .map_err(|e| FastStoreError::operation("delete", key, e))?;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, FastStoreError> {
        let mut conn = self.conn.clone();
        conn.keys(prefix_pattern(prefix))
            .await
            .map_err(|e| FastStoreError::operation("keys", prefix, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_pattern_appends_wildcard() {
        assert_eq!(prefix_pattern("pending_create_tx:"), "pending_create_tx:*");
    }

    #[test]
    fn test_prefix_pattern_escapes_glob_syntax() {
        assert_eq!(prefix_pattern("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let err = RedisFastStore::connect("not a url").await.err();
        assert!(matches!(err, Some(FastStoreError::Unavailable { .. })));
    }
}
