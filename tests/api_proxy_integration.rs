mod common;

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use rag_portal::backend::{Rag, RagCreate};
use rag_portal::server::{AppState, router};
use serde_json::{Value, json};

use common::{MockBackend, spawn_backend, test_config, unreachable_url};

fn server_for(backend_url: &str) -> TestServer {
    let state = AppState::new(Arc::new(test_config(backend_url))).unwrap();
    TestServer::new(router(state)).unwrap()
}

async fn setup() -> (MockBackend, TestServer) {
    let backend = spawn_backend().await;
    let server = server_for(&backend.url);
    (backend, server)
}

fn good_cookie() -> HeaderValue {
    HeaderValue::from_static("session=good")
}

fn header_str(response: &axum_test::TestResponse, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn me_mirrors_backend_without_caching() {
    let (_backend, server) = setup().await;

    let response = server
        .get("/api/auth/me")
        .add_header(header::COOKIE, good_cookie())
        .await;
    response.assert_status_ok();
    assert_eq!(header_str(&response, header::CACHE_CONTROL), "no-store");
    assert_eq!(response.json::<Value>()["id"], "u1");

    let response = server.get("/api/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["detail"],
        "Could not validate credentials"
    );
}

#[tokio::test]
async fn me_reports_bad_gateway_when_backend_is_down() {
    let server = server_for(&unreachable_url().await);

    let response = server
        .get("/api/auth/me")
        .add_header(header::COOKIE, good_cookie())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert!(response.json::<Value>()["detail"].is_string());
}

#[tokio::test]
async fn login_sets_session_cookie_and_lands_on_dashboard() {
    let (_backend, server) = setup().await;

    let response = server
        .post("/api/auth/login")
        .form(&json!({ "email": "ada@example.com", "password": "secret" }))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(header_str(&response, header::LOCATION), "/dashboard");
    let cookie = header_str(&response, header::SET_COOKIE);
    assert!(cookie.starts_with("session=good"), "{cookie}");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
}

#[tokio::test]
async fn failed_login_returns_to_signin_with_message() {
    let (_backend, server) = setup().await;

    let response = server
        .post("/api/auth/login")
        .form(&json!({ "email": "ada@example.com", "password": "wrong" }))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        header_str(&response, header::LOCATION),
        "/signin?error=Incorrect+email+or+password"
    );
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn signup_redirects_by_result() {
    let (_backend, server) = setup().await;

    let response = server
        .post("/api/auth/signup")
        .form(&json!({ "email": "new@example.com", "full_name": "New", "password": "pw" }))
        .await;
    assert_eq!(header_str(&response, header::LOCATION), "/signin");

    let response = server
        .post("/api/auth/signup")
        .form(&json!({ "email": "taken@example.com", "full_name": "Dup", "password": "pw" }))
        .await;
    assert_eq!(
        header_str(&response, header::LOCATION),
        "/signup?error=Email+already+registered"
    );
}

#[tokio::test]
async fn signup_failure_returns_to_configured_page() {
    let backend = spawn_backend().await;
    let mut config = test_config(&backend.url);
    config.gate.signup_path = "/register".to_string();
    let state = AppState::new(Arc::new(config)).unwrap();
    let server = TestServer::new(router(state)).unwrap();

    let response = server
        .post("/api/auth/signup")
        .form(&json!({ "email": "taken@example.com", "full_name": "Dup", "password": "pw" }))
        .await;
    assert_eq!(
        header_str(&response, header::LOCATION),
        "/register?error=Email+already+registered"
    );
}

#[tokio::test]
async fn logout_deletes_cookie_even_if_backend_is_down() {
    let (backend, server) = setup().await;

    let response = server
        .post("/api/auth/logout")
        .add_header(header::COOKIE, good_cookie())
        .await;
    assert_eq!(header_str(&response, header::LOCATION), "/signin");
    assert!(header_str(&response, header::SET_COOKIE).contains("Max-Age=0"));
    assert_eq!(
        backend
            .calls
            .logout
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );

    let offline = server_for(&unreachable_url().await);
    let response = offline
        .get("/api/auth/logout")
        .add_header(header::COOKIE, good_cookie())
        .await;
    assert_eq!(header_str(&response, header::LOCATION), "/signin");
    assert!(header_str(&response, header::SET_COOKIE).contains("Max-Age=0"));
}

#[tokio::test]
async fn rag_routes_require_a_session() {
    let (_backend, server) = setup().await;

    server
        .get("/api/rags")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/rags")
        .add_header(header::COOKIE, HeaderValue::from_static("session=stale"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rag_routes_relay_backend_data() {
    let (_backend, server) = setup().await;

    let rags: Vec<Rag> = server
        .get("/api/rags")
        .add_header(header::COOKIE, good_cookie())
        .await
        .json();
    assert_eq!(rags.len(), 2);
    assert_eq!(rags[0].qdrant_collection, "docs_prod");
    assert_eq!(rags[0].description, "");

    let rag: Rag = server
        .get("/api/rags/r1")
        .add_header(header::COOKIE, good_cookie())
        .await
        .json();
    assert_eq!(rag.name, "RAG r1");

    let response = server
        .get("/api/rags/nope")
        .add_header(header::COOKIE, good_cookie())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["detail"], "RAG not found");
}

#[tokio::test]
async fn create_rag_relays_status_and_body() {
    let (_backend, server) = setup().await;

    let payload = RagCreate {
        name: "Handbook".into(),
        qdrant_collection: "handbook".into(),
        ..RagCreate::default()
    };
    let response = server
        .post("/api/rags")
        .add_header(header::COOKIE, good_cookie())
        .json(&payload)
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["name"], "Handbook");
    assert_eq!(body["owner"], "u1");
}

#[tokio::test]
async fn ask_stream_passes_the_body_through() {
    let (_backend, server) = setup().await;

    let response = server
        .post("/api/rag/ask/stream")
        .add_header(header::COOKIE, good_cookie())
        .json(&json!({
            "query": "What is X?",
            "collection_name": "docs_prod",
            "embedding": "text-embedding-3-large"
        }))
        .await;

    response.assert_status_ok();
    assert!(header_str(&response, header::CONTENT_TYPE).starts_with("text/plain"));
    assert_eq!(response.text(), "The answer is Y.");

    let response = server
        .post("/api/rag/ask/stream")
        .add_header(header::COOKIE, good_cookie())
        .json(&json!({
            "query": "What is X?",
            "collection_name": "missing",
            "embedding": "text-embedding-3-large"
        }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
