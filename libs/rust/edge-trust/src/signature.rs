//! HMAC-SHA256 request signatures.
//!
//! The canonical string is
//! `METHOD\nPATH\nBODY_SHA256\nNONCE\nTIMESTAMP`, signed with the shared hop
//! secret and transmitted as lowercase hex.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use ring::hmac;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{AuthFailure, Credential, TrustError};
use crate::headers::{BODY_SHA256, HMAC_AUTH, HMAC_NONCE, HMAC_TIMESTAMP};

/// Build the canonical string both sides sign.
#[must_use]
pub fn canonical_string(
    method: &str,
    path: &str,
    body_sha256: &str,
    nonce: &str,
    timestamp: i64,
) -> String {
    format!("{method}\n{path}\n{body_sha256}\n{nonce}\n{timestamp}")
}

/// HMAC-SHA256 key for the edge → service hop.
pub struct SigningKey {
    key: hmac::Key,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Derive the key from the shared secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self::from_bytes(secret.expose_secret().as_bytes())
    }

    /// Derive the key from raw secret bytes.
    #[must_use]
    pub fn from_bytes(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    /// Sign `canonical` and return lowercase hex.
    #[must_use]
    pub fn sign(&self, canonical: &str) -> String {
        hex::encode(hmac::sign(&self.key, canonical.as_bytes()).as_ref())
    }

    /// Check a hex signature (either case) in constant time.
    #[must_use]
    pub fn verify(&self, canonical: &str, signature_hex: &str) -> bool {
        let Ok(tag) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        hmac::verify(&self.key, canonical.as_bytes(), &tag).is_ok()
    }
}

/// Everything attached to one signed hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// HTTP method
    pub method: String,
    /// Request path, without query
    pub path: String,
    /// Hex SHA-256 of the body
    pub body_sha256: String,
    /// Random single-use value
    pub nonce: String,
    /// Signing time, epoch seconds
    pub timestamp: i64,
    /// Hex HMAC over the canonical string
    pub signature: String,
}

impl SignedEnvelope {
    /// The canonical string this envelope was signed over.
    #[must_use]
    pub fn canonical(&self) -> String {
        canonical_string(
            &self.method,
            &self.path,
            &self.body_sha256,
            &self.nonce,
            self.timestamp,
        )
    }

    /// Write the four signing headers, replacing any existing values.
    ///
    /// # Errors
    ///
    /// `Signing` when a field is not a valid header value; `headers` is left
    /// untouched in that case.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), TrustError> {
        let signature = signing_value("signature", &self.signature)?;
        let nonce = signing_value("nonce", &self.nonce)?;
        let body = signing_value("body digest", &self.body_sha256)?;

        headers.insert(HMAC_AUTH, signature);
        headers.insert(HMAC_NONCE, nonce);
        headers.insert(BODY_SHA256, body);
        headers.insert(HMAC_TIMESTAMP, HeaderValue::from(self.timestamp));
        Ok(())
    }
}

fn signing_value(field: &str, value: &str) -> Result<HeaderValue, TrustError> {
    HeaderValue::from_str(value)
        .map_err(|_| TrustError::Signing(format!("{field} is not a valid header value")))
}

/// Signing headers as received by a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedSignature {
    /// Claimed signature
    pub signature: String,
    /// Claimed nonce
    pub nonce: String,
    /// Raw timestamp header
    pub timestamp: String,
    /// Claimed body digest, optional
    pub body_sha256: Option<String>,
}

impl ReceivedSignature {
    /// Read the signing headers.
    ///
    /// # Errors
    ///
    /// `MissingCredential(Request)` if signature, nonce or timestamp is
    /// absent, empty or not visible ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthFailure> {
        let required = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or(AuthFailure::MissingCredential(Credential::Request))
        };

        Ok(Self {
            signature: required(&HMAC_AUTH)?,
            nonce: required(&HMAC_NONCE)?,
            timestamp: required(&HMAC_TIMESTAMP)?,
            body_sha256: headers
                .get(&BODY_SHA256)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string()),
        })
    }

    /// Parsed timestamp; an unparseable value counts as outside the window.
    ///
    /// # Errors
    ///
    /// `Expired(Request)` when the header is not an integer.
    pub fn timestamp_secs(&self) -> Result<i64, AuthFailure> {
        self.timestamp
            .parse()
            .map_err(|_| AuthFailure::Expired(Credential::Request))
    }
}
