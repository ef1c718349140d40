use serde::{Deserialize, Serialize};

use crate::headers::TrustedIdentity;

/// Distinguishes access from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived bearer credential accepted at the edge
    Access,
    /// Long-lived credential exchanged for new access tokens
    Refresh,
}

impl TokenType {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set carried by platform tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Stable user id
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Role names
    #[serde(default)]
    pub roles: Vec<String>,
    /// Email, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Access or refresh
    pub token_type: TokenType,
    /// Issued at, epoch seconds
    pub iat: i64,
    /// Expires at, epoch seconds
    pub exp: i64,
    /// Token id
    #[serde(default)]
    pub jti: String,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Expired at `now`: the last valid second is `exp - 1`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Seconds of validity left at `now`, zero once expired.
    #[must_use]
    pub fn remaining_secs(&self, now: i64) -> u64 {
        u64::try_from(self.exp.saturating_sub(now)).unwrap_or(0)
    }

    /// Whether the token grants `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Identity headers the edge injects for this token.
    #[must_use]
    pub fn identity(&self) -> TrustedIdentity {
        TrustedIdentity {
            user_id: self.user_id.clone(),
            username: self.sub.clone(),
            roles: self.roles.clone(),
        }
    }

    /// Email claim, falling back to the subject.
    #[must_use]
    pub fn display_email(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.sub)
    }
}
