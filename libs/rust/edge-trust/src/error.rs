//! Failure taxonomy for the trust boundary.
//!
//! [`AuthFailure`] covers every authorization verdict: all variants are
//! terminal, non-retryable and surface as HTTP 401. [`TrustError`] adds the
//! infrastructure failures (store outage, oversized body) that block a request
//! without being a verdict about the caller.
//!
//! Client-facing messages are fixed strings; token material and secrets are
//! never echoed back.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rust_common::PlatformError;

/// Which credential a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// End-user bearer token checked at the edge
    Token,
    /// Per-hop HMAC envelope checked by internal services
    Request,
}

/// Authorization verdicts. Every variant maps to HTTP 401.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// No bearer token, or no HMAC headers
    #[error("{} credential missing", credential_name(*.0))]
    MissingCredential(Credential),

    /// Token is on the revocation list
    #[error("Token revoked")]
    Revoked,

    /// JWT or HMAC cryptographic mismatch, or a malformed token
    #[error("{} signature invalid", credential_name(*.0))]
    InvalidSignature(Credential),

    /// JWT past expiry, or HMAC timestamp outside the replay window
    #[error("{} expired", credential_name(*.0))]
    Expired(Credential),

    /// Body digest differs from the signed `X-Body-SHA256`
    #[error("Body integrity violation")]
    BodyIntegrityViolation,

    /// Nonce already seen inside the replay window
    #[error("Nonce replayed")]
    Replayed,
}

const fn credential_name(credential: Credential) -> &'static str {
    match credential {
        Credential::Token => "Token",
        Credential::Request => "Request",
    }
}

impl AuthFailure {
    /// Stable machine-readable code, used in logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::Revoked => "REVOKED",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::Expired(_) => "EXPIRED",
            Self::BodyIntegrityViolation => "BODY_INTEGRITY_VIOLATION",
            Self::Replayed => "REPLAYED",
        }
    }

    /// Message returned to the caller.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::MissingCredential(Credential::Token) => "Missing or invalid Authorization header",
            Self::MissingCredential(Credential::Request) => "Missing HMAC authentication headers",
            Self::Revoked => "Token has been revoked",
            Self::InvalidSignature(Credential::Token) => "Invalid token",
            Self::InvalidSignature(Credential::Request) => "Invalid signature",
            Self::Expired(Credential::Token) => "Token has expired",
            Self::Expired(Credential::Request) => "Request timestamp expired",
            Self::BodyIntegrityViolation => "Body hash mismatch",
            Self::Replayed => "Nonce already used",
        }
    }

    /// Authorization failures are never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Everything that can stop a request at the trust boundary.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Authorization verdict
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    /// Revocation store or nonce cache did not answer
    #[error("Security store unavailable: {0}")]
    StoreUnavailable(#[from] PlatformError),

    /// Request body exceeded the buffering limit
    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Request body could not be read
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// Outbound signing headers could not be built
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl TrustError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the authorization verdict, if this is one.
    #[must_use]
    pub const fn as_auth(&self) -> Option<&AuthFailure> {
        match self {
            Self::Auth(failure) => Some(failure),
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Auth(failure) => failure.public_message().to_string(),
            Self::StoreUnavailable(_) => "Authorization temporarily unavailable".to_string(),
            Self::BodyTooLarge { limit } => format!("Request body exceeds {limit} bytes"),
            Self::BodyRead(_) => "Unreadable request body".to_string(),
            Self::Signing(_) => "Request could not be forwarded".to_string(),
        }
    }
}

/// JSON body written for every rejected request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// HTTP reason phrase, e.g. `Unauthorized`
    pub error: String,
    /// Sanitized reason
    pub message: String,
    /// RFC 3339 timestamp of the rejection
    pub timestamp: String,
}

impl ErrorBody {
    /// Build a body for `status` with the given message, stamped now.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Render as an HTTP response with `status`.
    #[must_use]
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        ErrorBody::new(StatusCode::UNAUTHORIZED, self.public_message())
            .into_response_with(StatusCode::UNAUTHORIZED)
    }
}

impl IntoResponse for TrustError {
    fn into_response(self) -> Response {
        let status = self.status();
        ErrorBody::new(status, self.public_message()).into_response_with(status)
    }
}
