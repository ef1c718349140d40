//! Edge authentication.
//!
//! Each request ends in exactly one state:
//!
//! | state              | outcome                                  |
//! |--------------------|------------------------------------------|
//! | `PublicPath`       | forwarded without a token                |
//! | `MissingToken`     | 401                                      |
//! | `Revoked`          | 401                                      |
//! | `InvalidOrExpired` | 401                                      |
//! | `Authenticated`    | identity headers replaced, forwarded     |
//!
//! A revocation store that fails or times out yields 503; a request is never
//! forwarded on an unknown revocation status.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use edge_trust::error::Credential;
use edge_trust::{
    AuthFailure, Claims, PublicPaths, RevocationStore, TokenValidator, TrustError,
    TrustedIdentity, bearer_token,
};
use futures::future::BoxFuture;
use http::{HeaderMap, Request};
use tower::{Layer, Service};
use tracing::{debug, info, warn};

/// Successful outcomes of [`EdgeAuthenticator::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    /// Allowlisted path, no token required
    PublicPath,
    /// Verified caller; identity headers have been injected
    Authenticated(Box<Claims>),
}

/// State name for a rejected request.
#[must_use]
pub const fn rejection_state(err: &TrustError) -> &'static str {
    match err {
        TrustError::Auth(AuthFailure::MissingCredential(_)) => "MissingToken",
        TrustError::Auth(AuthFailure::Revoked) => "Revoked",
        TrustError::Auth(_) => "InvalidOrExpired",
        _ => "Unavailable",
    }
}

/// JWT gatekeeper for every inbound request.
pub struct EdgeAuthenticator {
    validator: Arc<TokenValidator>,
    revocations: RevocationStore,
    public_paths: PublicPaths,
}

impl EdgeAuthenticator {
    /// Build from its collaborators.
    #[must_use]
    pub const fn new(
        validator: Arc<TokenValidator>,
        revocations: RevocationStore,
        public_paths: PublicPaths,
    ) -> Self {
        Self {
            validator,
            revocations,
            public_paths,
        }
    }

    /// Decide on a request and rewrite its identity headers.
    ///
    /// Client-supplied identity headers are removed in every outcome; on
    /// `Authenticated` the verified ones are written in their place.
    ///
    /// # Errors
    ///
    /// `MissingCredential`, `Revoked`, `InvalidSignature` or `Expired` as
    /// [`TrustError::Auth`]; `StoreUnavailable` when the revocation store does
    /// not answer.
    pub async fn authenticate(
        &self,
        path: &str,
        headers: &mut HeaderMap,
    ) -> Result<EdgeDecision, TrustError> {
        TrustedIdentity::strip(headers);

        if self.public_paths.matches(path) {
            return Ok(EdgeDecision::PublicPath);
        }

        let token = bearer_token(headers)
            .ok_or(AuthFailure::MissingCredential(Credential::Token))?
            .to_string();

        if self.revocations.is_revoked(&token).await? {
            return Err(AuthFailure::Revoked.into());
        }

        let claims = self
            .validator
            .validate_access(&token)
            .map_err(AuthFailure::from)?;

        claims.identity().apply(headers)?;
        Ok(EdgeDecision::Authenticated(Box::new(claims)))
    }
}

/// Tower layer running an [`EdgeAuthenticator`] before the inner service.
#[derive(Clone)]
pub struct EdgeAuthLayer {
    authenticator: Arc<EdgeAuthenticator>,
}

impl EdgeAuthLayer {
    /// Wrap a shared authenticator.
    #[must_use]
    pub const fn new(authenticator: Arc<EdgeAuthenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S> Layer<S> for EdgeAuthLayer {
    type Service = EdgeAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EdgeAuthService {
            inner,
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

/// Service produced by [`EdgeAuthLayer`].
#[derive(Clone)]
pub struct EdgeAuthService<S> {
    inner: S,
    authenticator: Arc<EdgeAuthenticator>,
}

impl<S> Service<Request<Body>> for EdgeAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let authenticator = Arc::clone(&self.authenticator);
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let path = req.uri().path().to_string();

            match authenticator.authenticate(&path, req.headers_mut()).await {
                Ok(EdgeDecision::PublicPath) => {
                    debug!(state = "PublicPath", path = %path, "Public path");
                    inner.call(req).await
                }
                Ok(EdgeDecision::Authenticated(claims)) => {
                    info!(
                        state = "Authenticated",
                        path = %path,
                        user_id = %claims.user_id,
                        "Request authenticated"
                    );
                    req.extensions_mut().insert(*claims);
                    inner.call(req).await
                }
                Err(err) => {
                    match err.as_auth() {
                        Some(failure) => warn!(
                            state = rejection_state(&err),
                            path = %path,
                            reason = failure.code(),
                            "Request rejected"
                        ),
                        None => warn!(
                            state = rejection_state(&err),
                            path = %path,
                            error = %err,
                            "Revocation check failed"
                        ),
                    }
                    Ok(err.into_response())
                }
            }
        })
    }
}
