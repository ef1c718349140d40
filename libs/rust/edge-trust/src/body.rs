//! Request body buffering and hashing.
//!
//! A body stream can be consumed once. It is materialized into a single
//! [`Bytes`] buffer; the digest is computed from that buffer and any number of
//! new bodies are built over the same (reference-counted) bytes, so what is
//! hashed is exactly what is sent or handed to the next handler.

use axum::body::Body;
use bytes::Bytes;
use http_body_util::LengthLimitError;
use sha2::{Digest, Sha256};

use crate::error::TrustError;

/// Lowercase hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A fully read body and its digest.
#[derive(Debug, Clone)]
pub struct BufferedBody {
    bytes: Bytes,
    sha256: String,
}

impl BufferedBody {
    /// Wrap bytes that are already in memory.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let sha256 = sha256_hex(&bytes);
        Self { bytes, sha256 }
    }

    /// Read `body` to the end, refusing more than `limit` bytes.
    ///
    /// # Errors
    ///
    /// `BodyTooLarge` when the limit is exceeded, `BodyRead` when the stream
    /// fails.
    pub async fn read(body: Body, limit: usize) -> Result<Self, TrustError> {
        match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => Ok(Self::from_bytes(bytes)),
            Err(err) => {
                if is_length_limit(&err) {
                    Err(TrustError::BodyTooLarge { limit })
                } else {
                    Err(TrustError::BodyRead(err.to_string()))
                }
            }
        }
    }

    /// The buffered bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Hex SHA-256 of the buffered bytes.
    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// A fresh body over the same bytes.
    #[must_use]
    pub fn to_body(&self) -> Body {
        Body::from(self.bytes.clone())
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
