//! Same-origin JSON and form endpoints, mounted under `/api`.
//!
//! The session gate never runs for these paths; handlers that need a user
//! resolve it with [`ApiUser`](crate::auth::ApiUser).

mod auth;
mod rags;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::backend::Upstream;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/logout", get(auth::logout).post(auth::logout))
        .route("/rags", get(rags::list).post(rags::create))
        .route("/rags/{id}", get(rags::show))
        .route("/rag/ask/stream", post(rags::ask_stream))
}

/// Mirror a backend response: status, content type and body.
fn relay(upstream: Upstream) -> Response {
    let content_type = upstream
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    (
        upstream.status,
        [(header::CONTENT_TYPE, content_type)],
        Body::from(upstream.body),
    )
        .into_response()
}

/// `base?error=<message>`, form-encoded.
fn with_error(base: &str, message: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!("{base}?error={encoded}")
}
