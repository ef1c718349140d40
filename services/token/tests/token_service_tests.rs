//! Token service driven through its router with gateway-signed requests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::response::Response;
use edge_trust::headers::{AUTHENTICATED, USER_ID, USERNAME};
use edge_trust::{BufferedBody, ErrorBody, RequestSigner, RevocationStore, TokenValidator};
use http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use rust_common::{InMemoryStore, KeyValueStore};
use test_utils::fixtures::{ALICE, BOB, HMAC_SECRET, JWT_SECRET, hmac_secret, jwt_secret, now};
use test_utils::mocks::UnavailableStore;
use token_service::handlers::RefreshResponse;
use token_service::{AppState, Config, router};
use tower::ServiceExt;

fn config() -> Config {
    Config::from_map(&HashMap::from([
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ("HMAC_SECRET".to_string(), HMAC_SECRET.to_string()),
    ]))
    .unwrap()
}

fn app(store: Arc<dyn KeyValueStore>) -> Router {
    router(AppState::new(&config(), store))
}

/// A POST as the gateway would forward it: identity headers and a fresh
/// hop signature over the exact body.
fn signed_post(path: &str, bearer: Option<&str>, body: &str) -> Request<Body> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_ID, HeaderValue::from_static(ALICE.user_id));
    headers.insert(USERNAME, HeaderValue::from_static(ALICE.username));
    headers.insert(AUTHENTICATED, HeaderValue::from_static("true"));
    if let Some(token) = bearer {
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
    }

    let buffered = BufferedBody::from_bytes(body.as_bytes().to_vec());
    RequestSigner::new(&hmac_secret())
        .sign_headers("POST", path, &buffered, &mut headers)
        .unwrap();

    let mut request = Request::post(path).body(Body::from(body.to_string())).unwrap();
    *request.headers_mut() = headers;
    request
}

fn refresh_body(token: &str) -> String {
    serde_json::json!({ "refreshToken": token }).to_string()
}

async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn refresh_issues_access_token_for_same_user() {
    let refresh = ALICE.refresh_token(now(), 604_800);

    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(signed_post("/api/auth/refresh", None, &refresh_body(&refresh)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: RefreshResponse = json(response).await;
    assert_eq!(body.token_type, "Bearer");
    assert!(body.expires_at > now());

    let claims = TokenValidator::new(&jwt_secret())
        .validate_access(&body.access_token)
        .unwrap();
    assert_eq!(claims.user_id, ALICE.user_id);
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.email.as_deref(), Some("alice@example.edu"));
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let access = ALICE.access_token(now(), 900);

    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(signed_post("/api/auth/refresh", None, &refresh_body(&access)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.message, "Invalid token");
}

#[tokio::test]
async fn refresh_rejects_revoked_token() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::default());
    let refresh = BOB.refresh_token(now(), 604_800);
    RevocationStore::new(Arc::clone(&store))
        .revoke_until(&refresh, now() + 604_800, now())
        .await
        .unwrap();

    let response = app(store)
        .oneshot(signed_post("/api/auth/refresh", None, &refresh_body(&refresh)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.message, "Token has been revoked");
}

#[tokio::test]
async fn refresh_with_unreadable_body_is_400() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(signed_post("/api/auth/refresh", None, "{\"token\":1}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsigned_request_never_reaches_handler() {
    let refresh = ALICE.refresh_token(now(), 604_800);

    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(
            Request::post("/api/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(refresh_body(&refresh)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.message, "Missing HMAC authentication headers");
}

#[tokio::test]
async fn logout_revokes_access_and_refresh_tokens() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::default());
    let app = app(Arc::clone(&store));
    let access = ALICE.access_token(now(), 900);
    let refresh = ALICE.refresh_token(now(), 604_800);

    let response = app
        .clone()
        .oneshot(signed_post("/api/auth/logout", Some(&access), &refresh_body(&refresh)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let revocations = RevocationStore::new(store);
    assert!(revocations.is_revoked(&access).await.unwrap());
    assert!(revocations.is_revoked(&refresh).await.unwrap());

    let again = app
        .oneshot(signed_post("/api/auth/refresh", None, &refresh_body(&refresh)))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_with_expired_token_is_a_no_op() {
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::default());
    let expired = ALICE.access_token(now() - 2_000, 900);

    let response = app(Arc::clone(&store))
        .oneshot(signed_post("/api/auth/logout", Some(&expired), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!RevocationStore::new(store).is_revoked(&expired).await.unwrap());
}

#[tokio::test]
async fn logout_requires_bearer_token() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(signed_post("/api/auth/logout", None, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.message, "Missing or invalid Authorization header");
}

#[tokio::test]
async fn store_outage_is_503() {
    let refresh = ALICE.refresh_token(now(), 604_800);

    let response = app(Arc::new(UnavailableStore))
        .oneshot(signed_post("/api/auth/refresh", None, &refresh_body(&refresh)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_needs_no_signature() {
    let response = app(Arc::new(InMemoryStore::default()))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
