//! Header names on the edge → service hop and the trusted identity set.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{AuthFailure, Credential};

/// HMAC signature over the canonical request string (hex).
pub const HMAC_AUTH: HeaderName = HeaderName::from_static("hmac-auth");
/// Per-request random nonce.
pub const HMAC_NONCE: HeaderName = HeaderName::from_static("hmac-nonce");
/// Signing time, epoch seconds.
pub const HMAC_TIMESTAMP: HeaderName = HeaderName::from_static("hmac-timestamp");
/// SHA-256 of the request body (hex).
pub const BODY_SHA256: HeaderName = HeaderName::from_static("x-body-sha256");

/// Verified user id.
pub const USER_ID: HeaderName = HeaderName::from_static("x-user-id");
/// Verified username (JWT subject).
pub const USERNAME: HeaderName = HeaderName::from_static("x-username");
/// Verified roles, comma-joined.
pub const USER_ROLES: HeaderName = HeaderName::from_static("x-user-roles");
/// Always `true` when the identity headers were injected by the edge.
pub const AUTHENTICATED: HeaderName = HeaderName::from_static("x-authenticated");
/// Display attribute set by the non-authoritative derived-identity filter.
pub const USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");

/// Identity headers only the edge may set.
pub const IDENTITY_HEADERS: [HeaderName; 4] = [USER_ID, USERNAME, USER_ROLES, AUTHENTICATED];

/// Identity established by the edge from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedIdentity {
    /// User id claim
    pub user_id: String,
    /// Subject claim
    pub username: String,
    /// Role claims
    pub roles: Vec<String>,
}

impl TrustedIdentity {
    /// Remove every identity header, all occurrences.
    pub fn strip(headers: &mut HeaderMap) {
        for name in &IDENTITY_HEADERS {
            // `remove` drops every value stored under the name
            headers.remove(name);
        }
    }

    /// Strip any inbound identity headers, then write this identity.
    ///
    /// Stripping always precedes injection, so applying this twice leaves a
    /// single copy of each header.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidSignature(Token)` when a claim cannot be carried in
    /// a header value; nothing is injected in that case.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthFailure> {
        let user_id = header_value(&self.user_id)?;
        let username = header_value(&self.username)?;
        let roles = header_value(&self.roles.join(","))?;

        Self::strip(headers);
        headers.insert(USER_ID, user_id);
        headers.insert(USERNAME, username);
        headers.insert(USER_ROLES, roles);
        headers.insert(AUTHENTICATED, HeaderValue::from_static("true"));
        Ok(())
    }

    /// Read the identity injected by the edge.
    ///
    /// Only meaningful behind the internal verifier, which guarantees the
    /// headers came from the edge.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        if headers.get(&AUTHENTICATED).and_then(|v| v.to_str().ok()) != Some("true") {
            return None;
        }
        let user_id = headers.get(&USER_ID)?.to_str().ok()?.to_string();
        let username = headers.get(&USERNAME)?.to_str().ok()?.to_string();
        let roles = headers
            .get(&USER_ROLES)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            user_id,
            username,
            roles,
        })
    }

    /// Check role membership.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthFailure> {
    HeaderValue::from_str(value).map_err(|_| AuthFailure::InvalidSignature(Credential::Token))
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively; an empty token counts as absent.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
