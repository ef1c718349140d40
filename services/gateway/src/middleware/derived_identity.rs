//! Derived `X-User-Email` header.
//!
//! Convenience for downstream display code only. It is not part of the trust
//! boundary and never blocks a request: any decode failure just leaves the
//! header unset.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use edge_trust::headers::USER_EMAIL;
use edge_trust::{TokenValidator, bearer_token};
use http::{HeaderMap, HeaderValue, Request};
use tower::{Layer, Service};
use tracing::debug;

/// Replace any inbound `X-User-Email` with the one derived from the bearer.
pub fn derive_email(validator: &TokenValidator, headers: &mut HeaderMap) {
    headers.remove(&USER_EMAIL);

    let Some(token) = bearer_token(headers) else {
        return;
    };

    match validator.validate_access(token) {
        Ok(claims) => match HeaderValue::from_str(claims.display_email()) {
            Ok(value) => {
                headers.insert(USER_EMAIL, value);
            }
            Err(_) => debug!("Email claim not representable as a header"),
        },
        Err(err) => debug!(error = %err, "Skipping derived email"),
    }
}

/// Tower layer applying [`derive_email`].
#[derive(Clone)]
pub struct DerivedIdentityLayer {
    validator: Arc<TokenValidator>,
}

impl DerivedIdentityLayer {
    /// Share the edge's validator.
    #[must_use]
    pub const fn new(validator: Arc<TokenValidator>) -> Self {
        Self { validator }
    }
}

impl<S> Layer<S> for DerivedIdentityLayer {
    type Service = DerivedIdentityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DerivedIdentityService {
            inner,
            validator: Arc::clone(&self.validator),
        }
    }
}

/// Service produced by [`DerivedIdentityLayer`].
#[derive(Clone)]
pub struct DerivedIdentityService<S> {
    inner: S,
    validator: Arc<TokenValidator>,
}

impl<S> Service<Request<Body>> for DerivedIdentityService<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        derive_email(&self.validator, req.headers_mut());
        self.inner.call(req)
    }
}
