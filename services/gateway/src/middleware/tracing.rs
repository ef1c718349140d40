//! Request span with a correlation id.

use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::response::Response;
use futures::future::BoxFuture;
use http::{HeaderValue, Request};
use tower::{Layer, Service};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Response header echoing the correlation id.
pub const CORRELATION_ID: http::HeaderName = http::HeaderName::from_static("x-correlation-id");

/// Tracing layer for Tower.
#[derive(Clone)]
pub struct TracingLayer {
    service_name: &'static str,
}

impl TracingLayer {
    /// Creates a new tracing layer.
    #[must_use]
    pub const fn new(service_name: &'static str) -> Self {
        Self { service_name }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            service_name: self.service_name,
        }
    }
}

/// Tracing service wrapper.
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
    service_name: &'static str,
}

impl<S> Service<Request<Body>> for TracingService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let correlation_id = Uuid::new_v4();
        let started = Instant::now();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = info_span!(
            "request",
            service = self.service_name,
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let mut response = inner.call(req).await?;

                info!(
                    status = response.status().as_u16(),
                    latency_ms = started.elapsed().as_millis(),
                    "Request completed"
                );
                if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                    response.headers_mut().insert(CORRELATION_ID, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
