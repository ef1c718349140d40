//! TTL key/value store used for short-lived security markers.
//!
//! Values are sentinels: callers only care whether a key is present. Every
//! key carries its own expiry, so nothing is ever deleted explicitly.
//! Two backends are provided: a process-local map for single-node and test
//! deployments, and Redis for state shared across replicas.

use crate::PlatformError;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

const SENTINEL: &str = "1";

/// Key/value store with native per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `key` for exactly `ttl`, replacing any previous entry.
    async fn put_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), PlatformError>;

    /// Store `key` for `ttl` only if it is not already present.
    ///
    /// Returns `true` when the key was inserted by this call.
    async fn put_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, PlatformError>;

    /// Check whether `key` is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool, PlatformError>;
}

/// Default minimum gap between two full sweeps of an [`InMemoryStore`].
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Process-local store with lazy expiry.
///
/// `max_entries` is a hard bound. A full store sweeps expired entries at most
/// once per sweep interval; if it is still full, new keys are refused with
/// `Unavailable` rather than evicting live ones.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<Entries>>,
    max_entries: usize,
    sweep_interval: Duration,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Instant>,
    last_sweep: Option<Instant>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl InMemoryStore {
    /// Create a store holding at most `max_entries` keys.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(Entries::default())),
            max_entries,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Override the minimum gap between sweeps.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.state.read().await.map.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.map.is_empty()
    }

    /// Make room for `key`, which is about to be inserted at `now`.
    fn reserve(&self, entries: &mut Entries, key: &str, now: Instant) -> Result<(), PlatformError> {
        if entries.map.len() < self.max_entries || entries.map.contains_key(key) {
            return Ok(());
        }

        let due = entries
            .last_sweep
            .is_none_or(|last| now.duration_since(last) >= self.sweep_interval);
        if due {
            let before = entries.map.len();
            entries.map.retain(|_, expires_at| *expires_at > now);
            entries.last_sweep = Some(now);
            debug!(evicted = before - entries.map.len(), "Swept expired entries");
        }

        if entries.map.len() < self.max_entries {
            Ok(())
        } else {
            warn!(max_entries = self.max_entries, "In-memory store full");
            Err(PlatformError::unavailable(format!(
                "in-memory store holds {} live entries",
                self.max_entries
            )))
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn put_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), PlatformError> {
        let now = Instant::now();
        let mut entries = self.state.write().await;
        self.reserve(&mut entries, key, now)?;
        entries.map.insert(key.to_string(), now + ttl);
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, PlatformError> {
        let now = Instant::now();
        let mut entries = self.state.write().await;
        if entries.map.get(key).is_some_and(|expires_at| *expires_at > now) {
            return Ok(false);
        }
        self.reserve(&mut entries, key, now)?;
        entries.map.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        let entries = self.state.read().await;
        Ok(entries
            .map
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now()))
    }
}

/// Redis-backed store; expiry is delegated to Redis (`PX`).
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, PlatformError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PlatformError::invalid_input(format!("Invalid Redis URL: {e}")))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(skip(self, key), level = "debug")]
    async fn put_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), PlatformError> {
        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(key, SENTINEL, ttl_millis(ttl))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, key), level = "debug")]
    async fn put_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(SENTINEL)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    #[instrument(skip(self, key), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_exists() {
        let store = InMemoryStore::default();

        assert!(!store.exists("key").await.unwrap());
        store.put_with_ttl("key", Duration::from_secs(60)).await.unwrap();
        assert!(store.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = InMemoryStore::default();

        store.put_with_ttl("key", Duration::from_millis(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!store.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_if_absent_only_first_wins() {
        let store = InMemoryStore::default();

        assert!(store.put_if_absent("nonce", Duration::from_secs(60)).await.unwrap());
        assert!(!store.put_if_absent("nonce", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_if_absent_after_expiry() {
        let store = InMemoryStore::default();

        assert!(store.put_if_absent("nonce", Duration::from_millis(1)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.put_if_absent("nonce", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_when_over_capacity() {
        let store = InMemoryStore::new(2);

        store.put_with_ttl("a", Duration::from_millis(1)).await.unwrap();
        store.put_with_ttl("b", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.put_with_ttl("c", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_full_store_refuses_new_live_keys() {
        let store = InMemoryStore::new(3).with_sweep_interval(Duration::ZERO);
        for key in ["a", "b", "c"] {
            assert!(store.put_if_absent(key, Duration::from_secs(60)).await.unwrap());
        }

        let err = store.put_if_absent("d", Duration::from_secs(60)).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.put_with_ttl("e", Duration::from_secs(60)).await.is_err());
        assert_eq!(store.len().await, 3);

        // Existing keys can still be refreshed and checked.
        store.put_with_ttl("a", Duration::from_secs(120)).await.unwrap();
        assert!(!store.put_if_absent("b", Duration::from_secs(60)).await.unwrap());
        assert!(store.exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_full_store_sweeps_at_most_once_per_interval() {
        let store = InMemoryStore::new(2).with_sweep_interval(Duration::from_secs(3_600));

        store.put_with_ttl("a", Duration::from_secs(60)).await.unwrap();
        store.put_with_ttl("b", Duration::from_secs(60)).await.unwrap();
        // First overflow sweeps, finds nothing expired, refuses.
        assert!(store.put_with_ttl("c", Duration::from_secs(60)).await.is_err());

        // Later overflows skip the sweep until the interval has passed.
        assert!(store.put_with_ttl("d", Duration::from_secs(60)).await.is_err());
        assert_eq!(store.len().await, 2);
        assert!(store.state.read().await.last_sweep.is_some());
    }

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }
}
