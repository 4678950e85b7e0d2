//! In-process stand-in for the RAG backend.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use rag_portal::config::{
    AppConfig, BackendConfig, GateConfig, LogConfig, ResilienceConfig, ServerConfig,
};
use serde_json::{Value, json};

pub const GOOD_SESSION: &str = "good";

#[derive(Debug, Default)]
pub struct Calls {
    pub me: AtomicUsize,
    pub ask: AtomicUsize,
    pub logout: AtomicUsize,
    /// Headers of the most recent `me` request.
    pub me_headers: Mutex<Option<HeaderMap>>,
}

#[derive(Debug)]
pub struct MockBackend {
    pub url: String,
    pub calls: Arc<Calls>,
}

impl MockBackend {
    pub fn me_calls(&self) -> usize {
        self.calls.me.load(Ordering::SeqCst)
    }

    pub fn ask_calls(&self) -> usize {
        self.calls.ask.load(Ordering::SeqCst)
    }

    /// Value of `name` on the last `me` request, if it carried one.
    pub fn last_me_header(&self, name: header::HeaderName) -> Option<String> {
        self.calls
            .me_headers
            .lock()
            .unwrap()
            .as_ref()?
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    }
}

pub async fn spawn_backend() -> MockBackend {
    let calls = Arc::new(Calls::default());
    let app = Router::new()
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/user/get-user-rags/{user_id}", get(list_rags))
        .route("/api/v1/user/get-rag-info/{rag_id}", get(rag_info))
        .route("/api/v1/user/create/{user_id}", post(create_rag))
        .route("/api/v1/rag/ask/stream", post(ask_stream))
        .with_state(Arc::clone(&calls));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        url: format!("http://{addr}"),
        calls,
    }
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn test_config(backend_url: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            static_dir: "static".to_string(),
        },
        backend: BackendConfig {
            url: backend_url.to_string(),
            public_url: None,
            session_check_timeout_secs: 2,
        },
        gate: GateConfig::default(),
        resilience: ResilienceConfig {
            timeout_disabled: false,
            request_timeout_secs: 10,
        },
        log: LogConfig { json: false },
    }
}

pub fn rag_json(id: &str, collection: &str) -> Value {
    json!({
        "id": id,
        "name": format!("RAG {id}"),
        "description": null,
        "status": "completed",
        "chunk_size": 1000,
        "chunk_overlap": 400,
        "embedding_model": "text-embedding-3-large",
        "llm_model": "gpt-4o-mini",
        "document_count": 2,
        "top_k": 5,
        "qdrant_collection": collection
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h == format!("Bearer {GOOD_SESSION}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Could not validate credentials" })),
    )
        .into_response()
}

async fn me(State(calls): State<Arc<Calls>>, headers: HeaderMap) -> Response {
    calls.me.fetch_add(1, Ordering::SeqCst);
    *calls.me_headers.lock().unwrap() = Some(headers.clone());
    if authorized(&headers) {
        Json(json!({ "id": "u1", "email": "ada@example.com", "full_name": "Ada" })).into_response()
    } else {
        unauthorized()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        Json(json!({ "access_token": GOOD_SESSION, "token_type": "bearer" })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
            .into_response()
    }
}

async fn signup(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response()
    } else {
        Json(json!({ "id": "u2", "email": body["email"], "full_name": body["full_name"] }))
            .into_response()
    }
}

async fn logout(State(calls): State<Arc<Calls>>) -> StatusCode {
    calls.logout.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn list_rags(Path(user_id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if user_id != "u1" {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!([rag_json("r1", "docs_prod"), rag_json("r2", "slow")])).into_response()
}

async fn rag_info(Path(rag_id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let collection = match rag_id.as_str() {
        "r1" => "docs_prod",
        "r2" => "slow",
        "r3" => "utf8",
        "r4" => "missing",
        "r5" => "broken",
        _ => {
            return (StatusCode::NOT_FOUND, Json(json!({ "detail": "RAG not found" })))
                .into_response();
        }
    };
    Json(rag_json(&rag_id, collection)).into_response()
}

async fn create_rag(Path(user_id): Path<String>, Json(body): Json<Value>) -> Response {
    let mut created = rag_json("r9", body["qdrant_collection"].as_str().unwrap_or_default());
    created["name"] = body["name"].clone();
    created["owner"] = json!(user_id);
    (StatusCode::CREATED, Json(created)).into_response()
}

fn chunked<I>(chunks: I) -> Body
where
    I: IntoIterator<Item = &'static [u8]>,
    I::IntoIter: Send + 'static,
{
    Body::from_stream(
        futures::stream::iter(chunks).map(|c| Ok::<_, Infallible>(Bytes::from_static(c))),
    )
}

async fn ask_stream(
    State(calls): State<Arc<Calls>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    calls.ask.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    let text = [(header::CONTENT_TYPE, "text/plain; charset=utf-8")];
    match body["collection_name"].as_str().unwrap_or_default() {
        "docs_prod" => (text, chunked([&b"The "[..], &b"answer "[..], &b"is Y."[..]])).into_response(),
        "utf8" => (text, chunked([&b"Price: \xe2"[..], &b"\x82"[..], &b"\xac5"[..]])).into_response(),
        "slow" => {
            let first = futures::stream::once(async {
                Ok::<_, Infallible>(Bytes::from_static(b"Thinking"))
            });
            let body = Body::from_stream(first.chain(futures::stream::pending()));
            (text, body).into_response()
        }
        "broken" => {
            let first = futures::stream::once(async {
                Ok::<_, std::io::Error>(Bytes::from_static(b"Partial "))
            });
            let crash = futures::stream::once(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(std::io::Error::other("backend crashed"))
            });
            (text, Body::from_stream(first.chain(crash))).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "collection not found").into_response(),
    }
}
