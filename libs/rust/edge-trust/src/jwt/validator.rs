//! HS256 token validation against the shared JWT secret.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey};
use secrecy::{ExposeSecret, SecretString};

use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::error::TokenError;
use crate::jwt::token::{ClaimRules, Token, Unvalidated, Validated};

/// Validates platform tokens.
pub struct TokenValidator {
    key: DecodingKey,
    issuer: Option<String>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// The only accepted algorithm.
    pub const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Validator for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            issuer: None,
        }
    }

    /// Additionally require `iss == issuer`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Fully validate `raw` as a token of `expected_type` at time `now`.
    ///
    /// # Errors
    ///
    /// Any [`TokenError`] raised along the type-state chain.
    pub fn validate_at(
        &self,
        raw: &str,
        expected_type: TokenType,
        now: i64,
    ) -> Result<Token<Validated>, TokenError> {
        Token::<Unvalidated>::parse(raw)?
            .validate_signature(&self.key, Self::ALGORITHM)?
            .validate_claims(ClaimRules {
                now,
                expected_type,
                issuer: self.issuer.as_deref(),
            })
    }

    /// Validate a bearer access token now.
    ///
    /// # Errors
    ///
    /// See [`Self::validate_at`].
    pub fn validate_access(&self, raw: &str) -> Result<Claims, TokenError> {
        self.validate_at(raw, TokenType::Access, Utc::now().timestamp())
            .map(Token::into_claims)
    }

    /// Validate a refresh token now.
    ///
    /// # Errors
    ///
    /// See [`Self::validate_at`].
    pub fn validate_refresh(&self, raw: &str) -> Result<Claims, TokenError> {
        self.validate_at(raw, TokenType::Refresh, Utc::now().timestamp())
            .map(Token::into_claims)
    }
}
