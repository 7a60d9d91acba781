//! End-to-end sign-in flow over HTTP
//!
//! Drives the full router, middleware included, against the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};
use tower::ServiceExt;

use jibe_auth_server::auth::crypto::{address_from_verifying_key, personal_message_hash};
use jibe_auth_server::auth::SiweMessage;
use jibe_auth_server::config::{Config, NonceStoreBackend};
use jibe_auth_server::middleware::RateLimiter;
use jibe_auth_server::repository::InMemoryAuthRepository;
use jibe_auth_server::routes::build_router;
use jibe_auth_server::state::AppState;

const DOMAIN: &str = "example.com";

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> Config {
    Config {
        nonce_store: NonceStoreBackend::Memory,
        auth_domain: DOMAIN.to_string(),
        jwt_secret: Some("integration-test-secret".to_string()),
        ..Config::default()
    }
}

fn app_with(config: Config) -> Router {
    let state = AppState::from_config(&config, Arc::new(InMemoryAuthRepository::new()));
    build_router(state, &config, RateLimiter::new(config.rate_limit_rps))
}

fn app() -> Router {
    app_with(test_config())
}

struct Wallet {
    key: SigningKey,
    address: String,
}

impl Wallet {
    fn new(seed: u8) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    fn sign(&self, message: &str) -> String {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&personal_message_hash(message))
            .unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    fn sign_in_message(&self, nonce: &str) -> String {
        SiweMessage {
            domain: DOMAIN.to_string(),
            address: self.address.clone(),
            statement: "Sign in to Jibe".to_string(),
            uri: format!("https://{}", DOMAIN),
            version: "1".to_string(),
            chain_id: "1".to_string(),
            nonce: nonce.to_string(),
            issued_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
        .to_string()
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body, headers)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn request_nonce(app: &Router, address: &str) -> String {
    let (status, body, _) = send(
        app,
        post_json("/v1/auth/generate-nonce", json!({ "eth_addr": address })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["nonce"].as_str().unwrap().to_string()
}

// ============================================================================
// Nonce issuance
// ============================================================================

#[tokio::test]
async fn test_generate_nonce_returns_created() {
    let app = app();
    let wallet = Wallet::new(1);

    let nonce = request_nonce(&app, &wallet.address).await;
    assert_eq!(nonce.len(), 32);
    assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_generate_nonce_rejects_bad_address() {
    let app = app();

    for eth_addr in ["0x1234", "not-an-address", ""] {
        let (status, body, _) = send(
            &app,
            post_json("/v1/auth/generate-nonce", json!({ "eth_addr": eth_addr })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "eth_addr = {eth_addr:?}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_generate_nonce_rejects_malformed_json() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/generate-nonce")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn test_sign_in_then_replay() {
    let app = app();
    let wallet = Wallet::new(2);

    let nonce = request_nonce(&app, &wallet.address).await;
    let message = wallet.sign_in_message(&nonce);
    let verify_body = json!({ "message": message, "signature": wallet.sign(&message) });

    let (status, body, _) = send(&app, post_json("/v1/auth/verify", verify_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["address"], wallet.address.to_lowercase());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 1800);
    assert!(body["access_token"].as_str().unwrap().contains('.'));

    let (status, body, _) = send(&app, post_json("/v1/auth/verify", verify_body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Bad request: message verification failed");
}

#[tokio::test]
async fn test_failures_share_one_response() {
    let app = app();
    let wallet = Wallet::new(3);
    let impostor = Wallet::new(4);

    let nonce = request_nonce(&app, &wallet.address).await;
    let message = wallet.sign_in_message(&nonce);

    let forged = json!({ "message": message, "signature": impostor.sign(&message) });
    let garbage = json!({ "message": message, "signature": "0xdeadbeef" });
    let unknown_nonce = {
        let other = wallet.sign_in_message("ffffffffffffffffffffffffffffffff");
        json!({ "message": other, "signature": wallet.sign(&other) })
    };

    let mut bodies = Vec::new();
    for request in [forged, garbage, unknown_nonce] {
        let (status, body, _) = send(&app, post_json("/v1/auth/verify", request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        bodies.push(body);
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));

    // None of the failures above consumed the real nonce
    let legit = json!({ "message": message, "signature": wallet.sign(&message) });
    let (status, _, _) = send(&app, post_json("/v1/auth/verify", legit)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_rejects_empty_fields() {
    let app = app();
    let (status, body, _) = send(
        &app,
        post_json("/v1/auth/verify", json!({ "message": "", "signature": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let app = app_with(Config {
        jwt_secret: None,
        ..test_config()
    });
    let wallet = Wallet::new(5);

    let nonce = request_nonce(&app, &wallet.address).await;
    let message = wallet.sign_in_message(&nonce);
    let (status, body, _) = send(
        &app,
        post_json(
            "/v1/auth/verify",
            json!({ "message": message, "signature": wallet.sign(&message) }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
}

// ============================================================================
// Access tokens
// ============================================================================

#[tokio::test]
async fn test_me_with_access_token() {
    let app = app();
    let wallet = Wallet::new(6);

    let nonce = request_nonce(&app, &wallet.address).await;
    let message = wallet.sign_in_message(&nonce);
    let (_, body, _) = send(
        &app,
        post_json(
            "/v1/auth/verify",
            json!({ "message": message, "signature": wallet.sign(&message) }),
        ),
    )
    .await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/v1/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], wallet.address.to_lowercase());
    assert_eq!(
        body["expires_at"].as_i64().unwrap() - body["issued_at"].as_i64().unwrap(),
        1800
    );
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let app = app();

    let request = Request::builder()
        .uri("/v1/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");

    let request = Request::builder()
        .uri("/v1/auth/me")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

// ============================================================================
// Probes and middleware
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body, headers) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let (_, _, headers) = send(&app, request).await;
    assert_eq!(headers["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_rate_limit() {
    let app = app_with(Config {
        rate_limit_rps: 1,
        ..test_config()
    });

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let request = Request::builder()
            .uri("/health")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        statuses.push(send(&app, request).await.0);
    }

    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = app_with(Config {
        max_body_bytes: 64,
        ..test_config()
    });

    let (status, _, _) = send(
        &app,
        post_json(
            "/v1/auth/verify",
            json!({ "message": "x".repeat(1024), "signature": "0x00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
