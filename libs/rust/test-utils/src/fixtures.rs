//! Test fixtures with sample data.
//!
//! Tokens are minted here directly with `jsonwebtoken` so that tests can
//! produce shapes the production issuer never would: wrong secret, wrong
//! algorithm, wrong token type, already expired.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::SecretString;
use serde_json::{Value, json};

/// JWT secret used across tests.
pub const JWT_SECRET: &str = "test-jwt-secret-0123456789abcdef0123456789";
/// HMAC hop secret used across tests. Distinct from [`JWT_SECRET`].
pub const HMAC_SECRET: &str = "test-hmac-secret-fedcba9876543210fedcba98";

/// [`JWT_SECRET`] as a secret.
#[must_use]
pub fn jwt_secret() -> SecretString {
    SecretString::from(JWT_SECRET.to_string())
}

/// [`HMAC_SECRET`] as a secret.
#[must_use]
pub fn hmac_secret() -> SecretString {
    SecretString::from(HMAC_SECRET.to_string())
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleUser {
    /// Stable id
    pub user_id: &'static str,
    /// Username
    pub username: &'static str,
    /// Roles
    pub roles: &'static [&'static str],
    /// Email
    pub email: Option<&'static str>,
}

/// Student used in the end-to-end scenarios.
pub const ALICE: SampleUser = SampleUser {
    user_id: "3f1e9c2a-7b4d-4e8f-9a10-5c6d7e8f9a0b",
    username: "alice",
    roles: &["STUDENT"],
    email: Some("alice@example.edu"),
};

/// Instructor without an email claim.
pub const BOB: SampleUser = SampleUser {
    user_id: "8a7b6c5d-4e3f-4a1b-8c9d-0e1f2a3b4c5d",
    username: "bob",
    roles: &["INSTRUCTOR", "STUDENT"],
    email: None,
};

/// Id a client might try to impersonate.
pub const SPOOFED_ADMIN_ID: &str = "admin-uuid";

impl SampleUser {
    /// Claim set for a token of `token_type` issued at `iat`, living `ttl_secs`.
    #[must_use]
    pub fn claims(&self, token_type: &str, iat: i64, ttl_secs: i64) -> Value {
        let mut claims = json!({
            "sub": self.username,
            "userId": self.user_id,
            "roles": self.roles,
            "token_type": token_type,
            "iat": iat,
            "exp": iat + ttl_secs,
            "jti": uuid::Uuid::new_v4().to_string(),
        });
        if let Some(email) = self.email {
            claims["email"] = json!(email);
        }
        claims
    }

    /// HS256 access token signed with [`JWT_SECRET`].
    #[must_use]
    pub fn access_token(&self, iat: i64, ttl_secs: i64) -> String {
        mint(&self.claims("access", iat, ttl_secs), JWT_SECRET, Algorithm::HS256)
    }

    /// HS256 refresh token signed with [`JWT_SECRET`].
    #[must_use]
    pub fn refresh_token(&self, iat: i64, ttl_secs: i64) -> String {
        mint(&self.claims("refresh", iat, ttl_secs), JWT_SECRET, Algorithm::HS256)
    }
}

/// Sign arbitrary claims.
///
/// # Panics
///
/// If `jsonwebtoken` cannot encode the claims, which only happens for
/// asymmetric algorithms given an HMAC secret.
#[must_use]
#[allow(clippy::expect_used)]
pub fn mint(claims: &Value, secret: &str, alg: Algorithm) -> String {
    encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("HMAC tokens always encode")
}

/// Current time, epoch seconds.
#[must_use]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
