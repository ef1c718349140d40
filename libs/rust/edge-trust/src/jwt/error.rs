use thiserror::Error;

use crate::error::{AuthFailure, Credential};
use crate::jwt::claims::TokenType;

/// Token validation and issuance failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Header or payload cannot be decoded
    #[error("Token malformed: {reason}")]
    Malformed {
        /// Decoder message, never includes the token
        reason: String,
    },

    /// `alg` differs from the configured algorithm
    #[error("Token algorithm not accepted")]
    AlgorithmMismatch,

    /// Signature does not match the key
    #[error("Token signature invalid")]
    InvalidSignature,

    /// Past `exp`
    #[error("Token expired at {expired_at}")]
    Expired {
        /// Expiry, epoch seconds
        expired_at: i64,
    },

    /// Access token where a refresh token was expected, or the reverse
    #[error("Expected {expected} token, got {found}")]
    WrongType {
        /// Required type
        expected: TokenType,
        /// Presented type
        found: TokenType,
    },

    /// `iss` does not name the configured issuer
    #[error("Token issuer not accepted")]
    IssuerMismatch,

    /// Signing failed while minting a token
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for AuthFailure {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired { .. } => Self::Expired(Credential::Token),
            _ => Self::InvalidSignature(Credential::Token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_mapping() {
        assert_eq!(
            AuthFailure::from(TokenError::Expired { expired_at: 1 }),
            AuthFailure::Expired(Credential::Token)
        );
        for err in [
            TokenError::InvalidSignature,
            TokenError::AlgorithmMismatch,
            TokenError::IssuerMismatch,
            TokenError::Malformed { reason: "bad base64".to_string() },
            TokenError::WrongType { expected: TokenType::Access, found: TokenType::Refresh },
        ] {
            assert_eq!(AuthFailure::from(err), AuthFailure::InvalidSignature(Credential::Token));
        }
    }
}
