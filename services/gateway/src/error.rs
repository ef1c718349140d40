//! Gateway error types.
//!
//! Authorization verdicts and store outages come from the trust layer;
//! routing and upstream failures are the gateway's own. All of them render
//! as the same `{error, message, timestamp}` JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use edge_trust::{ErrorBody, TrustError};
use thiserror::Error;

/// Errors that stop a request at the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Rejected by the trust boundary
    #[error(transparent)]
    Trust(#[from] TrustError),

    /// No route prefix matches the path
    #[error("No route for {path}")]
    RouteNotFound {
        /// Request path
        path: String,
    },

    /// Upstream could not be reached or answered garbage
    #[error("Upstream {upstream} failed: {reason}")]
    Upstream {
        /// Upstream base URL
        upstream: String,
        /// Client error text
        reason: String,
    },
}

impl GatewayError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Trust(err) => err.status(),
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            Self::Trust(err) => err.into_response(),
            Self::RouteNotFound { .. } => {
                ErrorBody::new(StatusCode::NOT_FOUND, "No route for request path")
                    .into_response_with(StatusCode::NOT_FOUND)
            }
            Self::Upstream { .. } => {
                ErrorBody::new(StatusCode::BAD_GATEWAY, "Upstream service unavailable")
                    .into_response_with(StatusCode::BAD_GATEWAY)
            }
        }
    }
}
