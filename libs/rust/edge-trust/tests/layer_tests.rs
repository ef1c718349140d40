//! Internal verifier layer driven through an axum router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::routing::{get, post};
use bytes::Bytes;
use chrono::Utc;
use edge_trust::{
    BufferedBody, ErrorBody, InternalVerifier, InternalVerifierLayer, PublicPaths,
    RequestSigner, TrustedIdentity, VerifierConfig,
};
use http::{HeaderMap, Request, StatusCode};
use rust_common::{InMemoryStore, KeyValueStore};
use test_utils::fixtures::{ALICE, hmac_secret};
use test_utils::mocks::{StalledStore, UnavailableStore};
use tower::ServiceExt;

async fn echo(headers: HeaderMap, body: String) -> String {
    let who = TrustedIdentity::from_headers(&headers).map_or_else(String::new, |i| i.username);
    format!("{who}:{body}")
}

fn app(store: Arc<dyn KeyValueStore>) -> Router {
    let config = VerifierConfig::new(hmac_secret())
        .with_public_paths(PublicPaths::parse("/health"))
        .with_max_body_bytes(1024)
        .with_store_timeout(Duration::from_millis(50));
    let verifier = Arc::new(InternalVerifier::new(config, store));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/enrollments", post(echo))
        .layer(InternalVerifierLayer::new(verifier))
}

fn alice() -> TrustedIdentity {
    TrustedIdentity {
        user_id: ALICE.user_id.to_string(),
        username: ALICE.username.to_string(),
        roles: vec!["STUDENT".to_string()],
    }
}

fn signed_request(path: &str, body: impl Into<Bytes>) -> Request<Body> {
    let buffered = BufferedBody::from_bytes(body);
    let mut headers = HeaderMap::new();
    alice().apply(&mut headers).unwrap();
    RequestSigner::new(&hmac_secret())
        .sign_headers("POST", path, &buffered, &mut headers)
        .unwrap();

    let mut request = Request::post(path).body(buffered.to_body()).unwrap();
    *request.headers_mut() = headers;
    request
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn signed_request_reaches_handler_with_body_intact() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(signed_request("/api/enrollments", "{\"courseId\":42}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "alice:{\"courseId\":42}");
}

#[tokio::test]
async fn unsigned_request_gets_json_401() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(Request::post("/api/enrollments").body(Body::from("{}")).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.error, "Unauthorized");
    assert_eq!(body.message, "Missing HMAC authentication headers");
    assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).unwrap() <= Utc::now());
}

#[tokio::test]
async fn public_path_needs_no_signature() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn replayed_request_rejected() {
    let app = app(Arc::new(InMemoryStore::default()));
    let first = signed_request("/api/enrollments", "{}");
    let (parts, _) = first.into_parts();
    let replay = || {
        let mut r = Request::post("/api/enrollments").body(Body::from("{}")).unwrap();
        *r.headers_mut() = parts.headers.clone();
        r
    };

    let ok = app.clone().oneshot(replay()).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let again = app.oneshot(replay()).await.unwrap();
    assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = serde_json::from_str(&body_string(again).await).unwrap();
    assert_eq!(body.message, "Nonce already used");
}

#[tokio::test]
async fn tampered_body_rejected() {
    let request = signed_request("/api/enrollments", "{\"courseId\":42}");
    let (parts, _) = request.into_parts();
    let tampered = Request::from_parts(parts, Body::from("{\"courseId\":43}"));

    let response = app(Arc::new(InMemoryStore::default())).oneshot(tampered).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.message, "Body hash mismatch");
}

#[tokio::test]
async fn oversized_body_rejected_with_413() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(signed_request("/api/enrollments", vec![b'x'; 4096]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn nonce_store_outage_fails_closed() {
    let response = app(Arc::new(UnavailableStore))
        .oneshot(signed_request("/api/enrollments", "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stalled_nonce_store_fails_closed() {
    let response = tokio::time::timeout(
        Duration::from_secs(2),
        app(Arc::new(StalledStore)).oneshot(signed_request("/api/enrollments", "{}")),
    )
    .await
    .expect("verifier must give up on a stalled store")
    .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.message, "Authorization temporarily unavailable");
}
