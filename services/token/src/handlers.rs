//! HTTP handlers.
//!
//! Every route except `/health` sits behind the internal verifier, so the
//! identity headers seen here were written by the gateway.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use edge_trust::error::Credential;
use edge_trust::jwt::TokenSubject;
use edge_trust::{AuthFailure, Claims, TokenError, TokenType, TrustedIdentity, bearer_token};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TokenServiceError;
use crate::state::AppState;

/// `POST /api/auth/refresh` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Refresh token issued at login
    pub refresh_token: String,
}

/// `POST /api/auth/refresh` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token
    pub access_token: String,
    /// Its expiry, epoch seconds
    pub expires_at: i64,
    /// Always `Bearer`
    pub token_type: String,
}

/// `POST /api/auth/logout` body; optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    /// Refresh token to revoke alongside the access token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Exchange a refresh token for a new access token.
///
/// # Errors
///
/// `BadRequest` for an unreadable body, `Auth` for a revoked, expired or
/// invalid refresh token, `Store` when the revocation store does not answer.
pub async fn refresh(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RefreshResponse>, TokenServiceError> {
    let request: RefreshRequest = parse_json(&body)?;

    if state.revocations.is_revoked(&request.refresh_token).await? {
        return Err(AuthFailure::Revoked.into());
    }

    let claims = state
        .validator
        .validate_refresh(&request.refresh_token)
        .map_err(TokenServiceError::rejected)?;

    let issued = state
        .issuer
        .issue_at(
            &TokenSubject::from(&claims),
            TokenType::Access,
            Utc::now().timestamp(),
        )
        .map_err(|e| TokenServiceError::Issue(e.to_string()))?;

    info!(user_id = %claims.user_id, expires_at = issued.expires_at, "Access token refreshed");

    Ok(Json(RefreshResponse {
        access_token: issued.token,
        expires_at: issued.expires_at,
        token_type: "Bearer".to_string(),
    }))
}

/// Revoke the caller's access token and, if given, their refresh token.
///
/// An access token that has already expired needs no revocation; the
/// request still succeeds.
///
/// # Errors
///
/// `Auth` when no bearer token is present or a token is invalid,
/// `BadRequest` for an unreadable body, `Store` on revocation store failure.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, TokenServiceError> {
    let access = bearer_token(&headers)
        .ok_or(AuthFailure::MissingCredential(Credential::Token))?
        .to_string();

    let request: LogoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        parse_json(&body)?
    };

    let caller = TrustedIdentity::from_headers(&headers);
    let now = Utc::now().timestamp();

    // Validate everything before revoking anything.
    let access_claims = live_claims(state.validator.validate_access(&access))?;
    let refresh_claims = match &request.refresh_token {
        Some(token) => live_claims(state.validator.validate_refresh(token))?,
        None => None,
    };

    if let Some(claims) = &access_claims {
        state.revocations.revoke_until(&access, claims.exp, now).await?;
    }
    if let (Some(token), Some(claims)) = (&request.refresh_token, &refresh_claims) {
        state.revocations.revoke_until(token, claims.exp, now).await?;
    }

    match &caller {
        Some(identity) => info!(
            user_id = %identity.user_id,
            access_revoked = access_claims.is_some(),
            refresh_revoked = refresh_claims.is_some(),
            "Logged out"
        ),
        None => warn!(
            access_revoked = access_claims.is_some(),
            "Logout without trusted identity headers"
        ),
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `Ok(None)` for a token that has already expired.
fn live_claims(result: Result<Claims, TokenError>) -> Result<Option<Claims>, TokenServiceError> {
    match result {
        Ok(claims) => Ok(Some(claims)),
        Err(TokenError::Expired { expired_at }) => {
            debug!(expired_at, "Token already expired, nothing to revoke");
            Ok(None)
        }
        Err(err) => Err(TokenServiceError::rejected(err)),
    }
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, TokenServiceError> {
    serde_json::from_slice(body).map_err(|e| TokenServiceError::BadRequest(e.to_string()))
}
