//! Edge-side request signing.

use chrono::Utc;
use http::header::HeaderMap;
use secrecy::SecretString;
use uuid::Uuid;

use crate::body::BufferedBody;
use crate::error::TrustError;
use crate::signature::{SignedEnvelope, SigningKey, canonical_string};

/// Signs outbound hops. A disabled signer attaches nothing.
#[derive(Debug)]
pub struct RequestSigner {
    key: Option<SigningKey>,
}

impl RequestSigner {
    /// Signer using the shared hop secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: Some(SigningKey::new(secret)),
        }
    }

    /// Signer that leaves requests untouched (`HMAC_ENABLED=false`).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { key: None }
    }

    /// Whether requests are signed.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Build an envelope for `body` at time `now` with a fresh nonce.
    ///
    /// Returns `None` when signing is disabled.
    #[must_use]
    pub fn envelope_at(
        &self,
        method: &str,
        path: &str,
        body: &BufferedBody,
        now: i64,
    ) -> Option<SignedEnvelope> {
        let key = self.key.as_ref()?;
        let nonce = Uuid::new_v4().to_string();
        let signature = key.sign(&canonical_string(method, path, body.sha256(), &nonce, now));

        Some(SignedEnvelope {
            method: method.to_string(),
            path: path.to_string(),
            body_sha256: body.sha256().to_string(),
            nonce,
            timestamp: now,
            signature,
        })
    }

    /// Sign with the current time and write the headers onto `headers`.
    ///
    /// Returns `Ok(None)` when signing is disabled.
    ///
    /// # Errors
    ///
    /// `Signing` when the headers cannot be written; the request must not be
    /// forwarded unsigned.
    pub fn sign_headers(
        &self,
        method: &str,
        path: &str,
        body: &BufferedBody,
        headers: &mut HeaderMap,
    ) -> Result<Option<SignedEnvelope>, TrustError> {
        let Some(envelope) = self.envelope_at(method, path, body, Utc::now().timestamp()) else {
            return Ok(None);
        };
        envelope.apply(headers)?;
        Ok(Some(envelope))
    }
}
