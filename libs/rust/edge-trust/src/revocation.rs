//! Revoked-token store.
//!
//! Entries live for the remaining validity of the token, so the store never
//! needs explicit deletion: once a token would have expired anyway, the
//! validator rejects it on its own and the entry has already aged out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_common::{KeyValueStore, PlatformError};
use tracing::debug;

/// Default bound on a single store round-trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

const KEY_PREFIX: &str = "blacklist:";

/// Revocation list over a TTL key/value store.
#[derive(Clone)]
pub struct RevocationStore {
    store: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl RevocationStore {
    /// Store with the default call timeout.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Override the call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mark `token` revoked for exactly `ttl`.
    ///
    /// # Errors
    ///
    /// Store failure or timeout.
    pub async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), PlatformError> {
        self.bounded(self.store.put_with_ttl(&key(token), ttl)).await
    }

    /// Revoke `token` until `expires_at`. Returns `false` without touching
    /// the store when the token has already expired at `now`.
    ///
    /// # Errors
    ///
    /// Store failure or timeout.
    pub async fn revoke_until(
        &self,
        token: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, PlatformError> {
        let remaining = expires_at.saturating_sub(now);
        let Ok(secs) = u64::try_from(remaining) else {
            return Ok(false);
        };
        if secs == 0 {
            return Ok(false);
        }

        self.revoke(token, Duration::from_secs(secs)).await?;
        debug!(ttl_secs = secs, "Token revoked");
        Ok(true)
    }

    /// Whether `token` is currently revoked.
    ///
    /// # Errors
    ///
    /// Store failure or timeout. Callers must treat this as "unknown", not
    /// as "not revoked".
    pub async fn is_revoked(&self, token: &str) -> Result<bool, PlatformError> {
        self.bounded(self.store.exists(&key(token))).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, PlatformError>>,
    ) -> Result<T, PlatformError> {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            PlatformError::timeout(format!(
                "revocation store did not answer within {}ms",
                self.timeout.as_millis()
            ))
        })?
    }
}

fn key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}
