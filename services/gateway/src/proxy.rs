//! Signed forwarding to upstream services.
//!
//! The request body is read once into a buffer; that buffer is hashed,
//! signed, and sent as-is, so the upstream verifies exactly the bytes it
//! receives. The signed path is the one on the outbound URL, upstream base
//! path included.

use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use edge_trust::headers::{BODY_SHA256, HMAC_AUTH, HMAC_NONCE, HMAC_TIMESTAMP};
use edge_trust::{BufferedBody, RequestSigner};
use http::header::{self, HeaderMap, HeaderName};
use http::Request;
use tracing::{debug, warn};
use url::Url;

use crate::error::GatewayError;

/// Connection-scoped headers never forwarded in either direction.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// One `prefix → upstream` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    prefix: String,
    upstream: Url,
}

impl Route {
    /// Map paths under `prefix` to `upstream`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, upstream: Url) -> Self {
        let prefix = prefix.into();
        let prefix = match prefix.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self { prefix, upstream }
    }

    /// Path prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Upstream base URL.
    #[must_use]
    pub const fn upstream(&self) -> &Url {
        &self.upstream
    }

    fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return true;
        }
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Upstream URL for `path` and optional `query`; the path is kept whole.
    #[must_use]
    pub fn target(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.upstream.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}{path}"));
        url.set_query(query);
        url
    }
}

/// Routes ordered longest prefix first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table; the longest matching prefix wins.
    #[must_use]
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { routes }
    }

    /// Route for `path`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Forwards authenticated requests to their upstream.
pub struct Proxy {
    client: reqwest::Client,
    routes: RouteTable,
    signer: RequestSigner,
    max_body_bytes: usize,
}

impl Proxy {
    /// Build a proxy.
    ///
    /// # Errors
    ///
    /// When the HTTP client cannot be constructed.
    pub fn new(
        routes: RouteTable,
        signer: RequestSigner,
        upstream_timeout: Duration,
        max_body_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(upstream_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            routes,
            signer,
            max_body_bytes,
        })
    }

    /// Sign and forward `req`, relaying the upstream response.
    ///
    /// # Errors
    ///
    /// `RouteNotFound`, oversized or unreadable body, a signing failure, or an
    /// upstream failure.
    pub async fn forward(&self, req: Request<Body>) -> Result<Response, GatewayError> {
        let path = req.uri().path().to_string();
        let route = self
            .routes
            .resolve(&path)
            .ok_or_else(|| GatewayError::RouteNotFound { path: path.clone() })?;
        let target = route.target(&path, req.uri().query());

        let (parts, body) = req.into_parts();
        let body = BufferedBody::read(body, self.max_body_bytes).await?;

        let mut headers = outbound_headers(&parts.headers);
        self.signer
            .sign_headers(parts.method.as_str(), target.path(), &body, &mut headers)?;

        debug!(upstream = %route.upstream(), path = %target.path(), "Forwarding request");

        let upstream = self
            .client
            .request(parts.method, target)
            .headers(headers)
            .body(body.bytes().clone())
            .send()
            .await
            .map_err(|e| upstream_error(route, &e))?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        remove_hop_by_hop(&mut response_headers);
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| upstream_error(route, &e))?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn upstream_error(route: &Route, err: &reqwest::Error) -> GatewayError {
    warn!(upstream = %route.upstream(), error = %err, timeout = err.is_timeout(), "Upstream call failed");
    GatewayError::Upstream {
        upstream: route.upstream().to_string(),
        reason: err.to_string(),
    }
}

/// Inbound headers minus hop-by-hop, `Host`, and any client-supplied
/// signing headers. `Authorization` is kept.
fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    remove_hop_by_hop(&mut headers);
    for name in [
        header::HOST,
        header::CONTENT_LENGTH,
        HMAC_AUTH,
        HMAC_NONCE,
        HMAC_TIMESTAMP,
        BODY_SHA256,
    ] {
        headers.remove(name);
    }
    headers
}

fn remove_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}
