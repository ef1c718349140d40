//! Token minting for the token service.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use uuid::Uuid;

use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::error::TokenError;
use crate::jwt::validator::TokenValidator;

/// Who a token is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    /// Stable user id
    pub user_id: String,
    /// Username, becomes `sub`
    pub username: String,
    /// Role names
    pub roles: Vec<String>,
    /// Optional email
    pub email: Option<String>,
}

impl From<&Claims> for TokenSubject {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id.clone(),
            username: claims.sub.clone(),
            roles: claims.roles.clone(),
            email: claims.email.clone(),
        }
    }
}

/// A freshly minted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Encoded JWT
    pub token: String,
    /// Expiry, epoch seconds
    pub expires_at: i64,
}

/// Access and refresh token issued together at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token
    pub access_token: IssuedToken,
    /// Refresh token
    pub refresh_token: IssuedToken,
}

/// Mints HS256 tokens with per-type lifetimes.
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: Option<String>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Issuer signing with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            issuer: None,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Stamp tokens with `iss`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Lifetime of `token_type` tokens.
    #[must_use]
    pub const fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Mint a token of `token_type` issued at `now`.
    ///
    /// # Errors
    ///
    /// `Encoding` if signing fails.
    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        token_type: TokenType,
        now: i64,
    ) -> Result<IssuedToken, TokenError> {
        let ttl = i64::try_from(self.ttl(token_type).as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: subject.username.clone(),
            user_id: subject.user_id.clone(),
            roles: subject.roles.clone(),
            email: subject.email.clone(),
            token_type,
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(TokenValidator::ALGORITHM), &claims, &self.key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Mint an access token now.
    ///
    /// # Errors
    ///
    /// See [`Self::issue_at`].
    pub fn issue_access(&self, subject: &TokenSubject) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, TokenType::Access, Utc::now().timestamp())
    }

    /// Mint an access and a refresh token at `now`.
    ///
    /// # Errors
    ///
    /// See [`Self::issue_at`].
    pub fn issue_pair_at(&self, subject: &TokenSubject, now: i64) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_at(subject, TokenType::Access, now)?,
            refresh_token: self.issue_at(subject, TokenType::Refresh, now)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("jwt-secret-for-issuer-tests".to_string())
    }

    fn alice() -> TokenSubject {
        TokenSubject {
            user_id: "u-alice".to_string(),
            username: "alice".to_string(),
            roles: vec!["STUDENT".to_string()],
            email: Some("alice@example.edu".to_string()),
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&secret(), Duration::from_secs(900), Duration::from_secs(604_800))
            .with_issuer("edu-platform")
    }

    #[test]
    fn test_pair_has_independent_lifetimes() {
        let pair = issuer().issue_pair_at(&alice(), 1_000).unwrap();

        assert_eq!(pair.access_token.expires_at, 1_900);
        assert_eq!(pair.refresh_token.expires_at, 605_800);
        assert_ne!(pair.access_token.token, pair.refresh_token.token);
    }

    #[test]
    fn test_issued_tokens_validate_only_as_their_type() {
        let validator = TokenValidator::new(&secret()).with_issuer("edu-platform");
        let pair = issuer().issue_pair_at(&alice(), 1_000).unwrap();

        let access = validator
            .validate_at(&pair.access_token.token, TokenType::Access, 1_100)
            .unwrap();
        assert_eq!(access.claims().user_id, "u-alice");
        assert_eq!(access.claims().email.as_deref(), Some("alice@example.edu"));

        assert!(validator
            .validate_at(&pair.refresh_token.token, TokenType::Access, 1_100)
            .is_err());
        assert!(validator
            .validate_at(&pair.refresh_token.token, TokenType::Refresh, 1_100)
            .is_ok());
    }

    #[test]
    fn test_unique_jti() {
        let issuer = issuer();
        let validator = TokenValidator::new(&secret());
        let a = issuer.issue_at(&alice(), TokenType::Access, 1_000).unwrap();
        let b = issuer.issue_at(&alice(), TokenType::Access, 1_000).unwrap();

        let a = validator.validate_at(&a.token, TokenType::Access, 1_000).unwrap();
        let b = validator.validate_at(&b.token, TokenType::Access, 1_000).unwrap();
        assert_ne!(a.claims().jti, b.claims().jti);
    }

    #[test]
    fn test_subject_from_claims() {
        let validator = TokenValidator::new(&secret());
        let token = issuer().issue_at(&alice(), TokenType::Refresh, 0).unwrap();
        let claims = validator.validate_at(&token.token, TokenType::Refresh, 1).unwrap().into_claims();

        assert_eq!(TokenSubject::from(&claims), alice());
    }
}
