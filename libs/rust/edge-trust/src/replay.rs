//! Replay-window policy.
//!
//! The timestamp window alone lets a captured request be replayed verbatim
//! until it ages out. [`ReplayPolicy::NonceTracking`] closes that gap by
//! remembering every accepted nonce for the lifetime of the window.

use std::sync::Arc;
use std::time::Duration;

use rust_common::{KeyValueStore, PlatformError};

use crate::error::{AuthFailure, Credential, TrustError};
use crate::revocation::DEFAULT_STORE_TIMEOUT;

/// How signed requests are protected against replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Only the timestamp window is enforced; nonces are not remembered.
    TimestampOnly,
    /// Timestamp window plus single use of every nonce.
    #[default]
    NonceTracking,
}

impl ReplayPolicy {
    /// `true` → `NonceTracking`, `false` → `TimestampOnly`.
    #[must_use]
    pub const fn from_tracking_flag(tracking: bool) -> Self {
        if tracking {
            Self::NonceTracking
        } else {
            Self::TimestampOnly
        }
    }
}

/// Check `|now - timestamp| <= window`.
///
/// # Errors
///
/// `Expired(Request)` when outside the window, in either direction.
pub fn check_window(timestamp: i64, now: i64, window: Duration) -> Result<(), AuthFailure> {
    let window = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
    if now.abs_diff(timestamp) > window.unsigned_abs() {
        return Err(AuthFailure::Expired(Credential::Request));
    }
    Ok(())
}

/// Record of nonces seen inside the window.
#[derive(Clone)]
pub struct NonceCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    timeout: Duration,
}

impl NonceCache {
    /// A cache whose entries outlive the full `±window` a timestamp may span.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, window: Duration) -> Self {
        Self {
            store,
            ttl: window.saturating_mul(2),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Override the bound on a single store call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Admit `nonce` once.
    ///
    /// # Errors
    ///
    /// `Replayed` when the nonce was already used; `StoreUnavailable` when the
    /// backing store fails or does not answer within the timeout.
    pub async fn check_and_record(&self, nonce: &str) -> Result<(), TrustError> {
        let key = format!("hmac-nonce:{nonce}");
        let inserted = tokio::time::timeout(self.timeout, self.store.put_if_absent(&key, self.ttl))
            .await
            .map_err(|_| {
                PlatformError::timeout(format!(
                    "nonce store did not answer within {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        if inserted {
            Ok(())
        } else {
            Err(AuthFailure::Replayed.into())
        }
    }
}
