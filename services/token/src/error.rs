use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use edge_trust::{AuthFailure, ErrorBody, TokenError, TrustError};
use rust_common::PlatformError;
use thiserror::Error;

/// Errors returned by token service handlers.
#[derive(Error, Debug)]
pub enum TokenServiceError {
    /// Presented token rejected
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    /// Revocation store did not answer
    #[error("Revocation store unavailable: {0}")]
    Store(#[from] PlatformError),

    /// Request body is not what the endpoint expects
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Minting a new token failed
    #[error("Token issuance failed: {0}")]
    Issue(String),
}

impl TokenServiceError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Issue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a validation failure on a presented token.
    #[must_use]
    pub fn rejected(err: TokenError) -> Self {
        Self::Auth(AuthFailure::from(err))
    }
}

impl IntoResponse for TokenServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(failure) => failure.into_response(),
            Self::Store(err) => TrustError::StoreUnavailable(err).into_response(),
            Self::BadRequest(reason) => {
                ErrorBody::new(StatusCode::BAD_REQUEST, reason).into_response_with(StatusCode::BAD_REQUEST)
            }
            Self::Issue(_) => ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "Token issuance failed")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_trust::error::Credential;

    #[test]
    fn test_statuses() {
        assert_eq!(
            TokenServiceError::rejected(TokenError::Expired { expired_at: 0 }).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TokenServiceError::from(PlatformError::unavailable("redis down")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            TokenServiceError::BadRequest("missing refreshToken".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_wrong_type_is_invalid_token() {
        let err = TokenServiceError::rejected(TokenError::WrongType {
            expected: edge_trust::TokenType::Refresh,
            found: edge_trust::TokenType::Access,
        });
        assert!(matches!(
            err,
            TokenServiceError::Auth(AuthFailure::InvalidSignature(Credential::Token))
        ));
    }
}
