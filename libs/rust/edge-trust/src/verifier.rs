//! Service-side verification of signed hops.
//!
//! [`InternalVerifier`] holds the checks; [`InternalVerifierLayer`] wraps any
//! axum router so a business handler only runs on requests that carry a
//! fresh, untampered edge signature.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::future::BoxFuture;
use http::{HeaderMap, Request};
use rust_common::KeyValueStore;
use secrecy::SecretString;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::body::BufferedBody;
use crate::error::{AuthFailure, Credential, TrustError};
use crate::paths::PublicPaths;
use crate::replay::{NonceCache, ReplayPolicy, check_window};
use crate::revocation::DEFAULT_STORE_TIMEOUT;
use crate::signature::{ReceivedSignature, SigningKey, canonical_string};

/// Default accepted clock distance between signer and verifier.
pub const DEFAULT_REPLAY_WINDOW: Duration = Duration::from_secs(300);
/// Default body buffering cap.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Verifier settings, built from service configuration.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Shared hop secret
    pub secret: SecretString,
    /// `false` admits every request unchecked
    pub enabled: bool,
    /// Accepted `|now - timestamp|`
    pub window: Duration,
    /// Paths served without a signature
    pub public_paths: PublicPaths,
    /// Replay protection
    pub replay: ReplayPolicy,
    /// Body buffering cap
    pub max_body_bytes: usize,
    /// Bound on a single nonce-store call
    pub store_timeout: Duration,
}

impl VerifierConfig {
    /// Enabled verifier with default window, policy and body cap.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            enabled: true,
            window: DEFAULT_REPLAY_WINDOW,
            public_paths: PublicPaths::default(),
            replay: ReplayPolicy::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Set the replay window.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the public paths.
    #[must_use]
    pub fn with_public_paths(mut self, paths: PublicPaths) -> Self {
        self.public_paths = paths;
        self
    }

    /// Set the replay policy.
    #[must_use]
    pub const fn with_replay(mut self, replay: ReplayPolicy) -> Self {
        self.replay = replay;
        self
    }

    /// Toggle verification.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the body cap.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Set the nonce-store call timeout.
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

/// Checks a received hop against the shared secret.
pub struct InternalVerifier {
    key: SigningKey,
    enabled: bool,
    window: Duration,
    public_paths: PublicPaths,
    nonces: Option<NonceCache>,
    max_body_bytes: usize,
}

impl InternalVerifier {
    /// Build a verifier. `store` backs the nonce cache under
    /// [`ReplayPolicy::NonceTracking`] and is unused otherwise.
    #[must_use]
    pub fn new(config: VerifierConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let nonces = match config.replay {
            ReplayPolicy::NonceTracking => {
                Some(NonceCache::new(store, config.window).with_timeout(config.store_timeout))
            }
            ReplayPolicy::TimestampOnly => None,
        };

        Self {
            key: SigningKey::new(&config.secret),
            enabled: config.enabled,
            window: config.window,
            public_paths: config.public_paths,
            nonces,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Whether `path` is admitted without checks.
    #[must_use]
    pub fn bypasses(&self, path: &str) -> bool {
        !self.enabled || self.public_paths.matches(path)
    }

    /// Body buffering cap.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Run every check against a buffered request at time `now`.
    ///
    /// # Errors
    ///
    /// The first failed check, in order: missing headers, window, body hash,
    /// signature, nonce reuse. A nonce-store outage is `StoreUnavailable`.
    pub async fn verify_at(
        &self,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        body: &BufferedBody,
        now: i64,
    ) -> Result<(), TrustError> {
        if self.bypasses(path) {
            return Ok(());
        }

        let received = ReceivedSignature::from_headers(headers)?;
        check_window(received.timestamp_secs()?, now, self.window)?;

        if let Some(claimed) = &received.body_sha256 {
            if !claimed.eq_ignore_ascii_case(body.sha256()) {
                return Err(AuthFailure::BodyIntegrityViolation.into());
            }
        }

        let canonical = canonical_string(
            method,
            path,
            body.sha256(),
            &received.nonce,
            received.timestamp_secs()?,
        );
        if !self.key.verify(&canonical, &received.signature) {
            return Err(AuthFailure::InvalidSignature(Credential::Request).into());
        }

        if let Some(nonces) = &self.nonces {
            nonces.check_and_record(&received.nonce).await?;
        }

        Ok(())
    }

    /// [`Self::verify_at`] with the current clock.
    ///
    /// # Errors
    ///
    /// See [`Self::verify_at`].
    pub async fn verify(
        &self,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        body: &BufferedBody,
    ) -> Result<(), TrustError> {
        self.verify_at(method, path, headers, body, Utc::now().timestamp())
            .await
    }
}

/// Tower layer placing an [`InternalVerifier`] in front of a service.
#[derive(Clone)]
pub struct InternalVerifierLayer {
    verifier: Arc<InternalVerifier>,
}

impl InternalVerifierLayer {
    /// Wrap a shared verifier.
    #[must_use]
    pub const fn new(verifier: Arc<InternalVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for InternalVerifierLayer {
    type Service = InternalVerifierService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InternalVerifierService {
            inner,
            verifier: Arc::clone(&self.verifier),
        }
    }
}

/// Service produced by [`InternalVerifierLayer`].
#[derive(Clone)]
pub struct InternalVerifierService<S> {
    inner: S,
    verifier: Arc<InternalVerifier>,
}

impl<S> Service<Request<Body>> for InternalVerifierService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let verifier = Arc::clone(&self.verifier);
        // Take the service that was polled ready, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let path = req.uri().path().to_string();
            if verifier.bypasses(&path) {
                return inner.call(req).await;
            }

            // Reject unsigned requests before paying for the body.
            if let Err(failure) = ReceivedSignature::from_headers(req.headers()) {
                warn!(path = %path, reason = failure.code(), "Rejected unsigned request");
                return Ok(failure.into_response());
            }

            let (parts, body) = req.into_parts();
            let buffered = match BufferedBody::read(body, verifier.max_body_bytes()).await {
                Ok(buffered) => buffered,
                Err(err) => {
                    warn!(path = %path, reason = %err, "Rejected unreadable request body");
                    return Ok(err.into_response());
                }
            };

            match verifier
                .verify(parts.method.as_str(), &path, &parts.headers, &buffered)
                .await
            {
                Ok(()) => {
                    debug!(path = %path, "Request signature verified");
                    inner
                        .call(Request::from_parts(parts, buffered.to_body()))
                        .await
                }
                Err(err) => {
                    match err.as_auth() {
                        Some(failure) => {
                            warn!(path = %path, reason = failure.code(), "Rejected unsigned or tampered request");
                        }
                        None => warn!(path = %path, error = %err, "Request verification unavailable"),
                    }
                    Ok(err.into_response())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{BODY_SHA256, HMAC_AUTH, HMAC_TIMESTAMP};
    use crate::signer::RequestSigner;
    use rust_common::InMemoryStore;

    const T0: i64 = 1_700_000_000;

    fn secret() -> SecretString {
        SecretString::from("hop-secret-for-verifier-tests".to_string())
    }

    fn verifier(replay: ReplayPolicy) -> InternalVerifier {
        let config = VerifierConfig::new(secret())
            .with_public_paths(PublicPaths::parse("/health"))
            .with_replay(replay);
        InternalVerifier::new(config, Arc::new(InMemoryStore::default()))
    }

    fn signed(method: &str, path: &str, body: &BufferedBody, at: i64) -> HeaderMap {
        let mut headers = HeaderMap::new();
        RequestSigner::new(&secret())
            .envelope_at(method, path, body, at)
            .unwrap()
            .apply(&mut headers)
            .unwrap();
        headers
    }

    #[tokio::test]
    async fn test_signed_request_accepted() {
        let v = verifier(ReplayPolicy::NonceTracking);
        let body = BufferedBody::from_bytes(&b"{\"courseId\":42}"[..]);
        let headers = signed("POST", "/api/enrollments", &body, T0);

        v.verify_at("POST", "/api/enrollments", &headers, &body, T0 + 10)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_headers_rejected() {
        let v = verifier(ReplayPolicy::TimestampOnly);
        let body = BufferedBody::from_bytes(Vec::new());

        let err = v
            .verify_at("GET", "/api/courses", &HeaderMap::new(), &body, T0)
            .await
            .unwrap_err();

        assert_eq!(
            err.as_auth(),
            Some(&AuthFailure::MissingCredential(Credential::Request))
        );
    }

    #[tokio::test]
    async fn test_public_path_bypass() {
        let v = verifier(ReplayPolicy::NonceTracking);
        let body = BufferedBody::from_bytes(Vec::new());

        v.verify_at("GET", "/health", &HeaderMap::new(), &body, T0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_numeric_timestamp_is_expired() {
        let v = verifier(ReplayPolicy::TimestampOnly);
        let body = BufferedBody::from_bytes(Vec::new());
        let mut headers = signed("GET", "/api/courses", &body, T0);
        headers.insert(HMAC_TIMESTAMP, "yesterday".parse().unwrap());

        let err = v
            .verify_at("GET", "/api/courses", &headers, &body, T0)
            .await
            .unwrap_err();

        assert_eq!(err.as_auth(), Some(&AuthFailure::Expired(Credential::Request)));
    }

    #[tokio::test]
    async fn test_body_hash_mismatch() {
        let v = verifier(ReplayPolicy::TimestampOnly);
        let body = BufferedBody::from_bytes(&b"original"[..]);
        let headers = signed("POST", "/api/x", &body, T0);
        let tampered = BufferedBody::from_bytes(&b"tampered"[..]);

        let err = v
            .verify_at("POST", "/api/x", &headers, &tampered, T0)
            .await
            .unwrap_err();

        assert_eq!(err.as_auth(), Some(&AuthFailure::BodyIntegrityViolation));
    }

    #[tokio::test]
    async fn test_body_hash_header_absent_still_covered_by_signature() {
        let v = verifier(ReplayPolicy::TimestampOnly);
        let body = BufferedBody::from_bytes(&b"original"[..]);
        let mut headers = signed("POST", "/api/x", &body, T0);
        headers.remove(BODY_SHA256);
        let tampered = BufferedBody::from_bytes(&b"tampered"[..]);

        let err = v
            .verify_at("POST", "/api/x", &headers, &tampered, T0)
            .await
            .unwrap_err();

        assert_eq!(
            err.as_auth(),
            Some(&AuthFailure::InvalidSignature(Credential::Request))
        );
    }

    #[tokio::test]
    async fn test_uppercase_digests_accepted() {
        let v = verifier(ReplayPolicy::TimestampOnly);
        let body = BufferedBody::from_bytes(&b"payload"[..]);
        let mut headers = signed("PUT", "/api/x", &body, T0);
        for name in [HMAC_AUTH, BODY_SHA256] {
            let upper = headers[&name].to_str().unwrap().to_uppercase();
            headers.insert(name, upper.parse().unwrap());
        }

        v.verify_at("PUT", "/api/x", &headers, &body, T0).await.unwrap();
    }

    #[tokio::test]
    async fn test_path_and_method_are_signed() {
        let v = verifier(ReplayPolicy::TimestampOnly);
        let body = BufferedBody::from_bytes(Vec::new());
        let headers = signed("GET", "/api/courses/1", &body, T0);

        for (method, path) in [("DELETE", "/api/courses/1"), ("GET", "/api/courses/2")] {
            let err = v.verify_at(method, path, &headers, &body, T0).await.unwrap_err();
            assert_eq!(
                err.as_auth(),
                Some(&AuthFailure::InvalidSignature(Credential::Request))
            );
        }
    }

    #[tokio::test]
    async fn test_replay_policy() {
        let body = BufferedBody::from_bytes(Vec::new());
        let headers = signed("GET", "/api/courses", &body, T0);

        let lenient = verifier(ReplayPolicy::TimestampOnly);
        lenient.verify_at("GET", "/api/courses", &headers, &body, T0).await.unwrap();
        lenient.verify_at("GET", "/api/courses", &headers, &body, T0).await.unwrap();

        let hardened = verifier(ReplayPolicy::NonceTracking);
        hardened.verify_at("GET", "/api/courses", &headers, &body, T0).await.unwrap();
        let err = hardened
            .verify_at("GET", "/api/courses", &headers, &body, T0)
            .await
            .unwrap_err();
        assert_eq!(err.as_auth(), Some(&AuthFailure::Replayed));
    }

    #[tokio::test]
    async fn test_disabled_admits_unsigned() {
        let config = VerifierConfig::new(secret()).with_enabled(false);
        let v = InternalVerifier::new(config, Arc::new(InMemoryStore::default()));

        v.verify_at("POST", "/api/x", &HeaderMap::new(), &BufferedBody::from_bytes(Vec::new()), T0)
            .await
            .unwrap();
    }
}
