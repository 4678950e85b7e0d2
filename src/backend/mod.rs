//! HTTP client for the RAG backend.
//!
//! Every call made on behalf of a browser forwards the browser's `Cookie`
//! header verbatim. The backend authenticates with bearer tokens, so the
//! session cookie's value is also copied into an `Authorization` header; the
//! token itself is never inspected.
//!
//! # Example
//!
//! ```rust,no_run
//! use rag_portal::backend::BackendClient;
//!
//! # async fn example() -> rag_portal::error::Result<()> {
//! let backend = BackendClient::new("http://localhost:8000", "session")?;
//! let me = backend.me("session=abc").await?;
//! println!("{}", me.status);
//! # Ok(())
//! # }
//! ```

pub mod types;

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header};
use axum_extra::extract::cookie::Cookie;
use url::Url;

use crate::error::{Error, Result};

pub use types::{
    AskRequest, CurrentUser, LoginRequest, Rag, RagCreate, RagStatus, SignupRequest,
    TokenResponse,
};

/// Prefix of every backend route.
const API_PREFIX: &str = "/api/v1";

/// A backend response relayed without interpretation.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl Upstream {
    async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    /// Turn a non-success relay into an [`Error::Api`].
    fn into_result(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::Api {
                status: self.status,
                message: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }
}

/// Shared backend client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
    cookie_name: String,
    session_check_timeout: Duration,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// `cookie_name` names the session cookie whose value is forwarded as a
    /// bearer token.
    pub fn new(base_url: impl AsRef<str>, cookie_name: impl Into<String>) -> Result<Self> {
        Self::with_client(base_url, cookie_name, reqwest::Client::new())
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(
        base_url: impl AsRef<str>,
        cookie_name: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            http,
            cookie_name: cookie_name.into(),
            session_check_timeout: Duration::from_secs(5),
        })
    }

    /// Bound the session check (`/auth/me`) by `timeout`.
    #[must_use]
    pub fn with_session_check_timeout(mut self, timeout: Duration) -> Self {
        self.session_check_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    /// Attach the browser's cookie header, and the session token as bearer auth.
    fn forward(&self, rb: reqwest::RequestBuilder, cookie_header: &str) -> reqwest::RequestBuilder {
        if cookie_header.is_empty() {
            return rb;
        }
        let rb = rb.header(header::COOKIE, cookie_header);
        match session_token(cookie_header, &self.cookie_name) {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    /// `GET /auth/me`, uncached, relayed as-is.
    pub async fn me(&self, cookie_header: &str) -> Result<Upstream> {
        let rb = self
            .http
            .get(self.url("/auth/me"))
            .header(header::CACHE_CONTROL, "no-store")
            .timeout(self.session_check_timeout);
        let response = self.forward(rb, cookie_header).send().await?;
        Upstream::read(response).await
    }

    /// `POST /auth/login`; returns the access token to store in the session cookie.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;
        let upstream = Upstream::read(response).await?.into_result()?;
        serde_json::from_slice(&upstream.body).map_err(|e| Error::Api {
            status: StatusCode::BAD_GATEWAY,
            message: format!("unexpected login response: {e}"),
        })
    }

    /// `POST /auth/signup`.
    pub async fn signup(&self, request: &SignupRequest) -> Result<Upstream> {
        let response = self
            .http
            .post(self.url("/auth/signup"))
            .json(request)
            .send()
            .await?;
        Upstream::read(response).await?.into_result()
    }

    /// `POST /auth/logout`.
    pub async fn logout(&self, cookie_header: &str) -> Result<()> {
        let rb = self.http.post(self.url("/auth/logout"));
        let response = self.forward(rb, cookie_header).send().await?;
        Upstream::read(response).await?.into_result()?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // RAG configurations
    // ─────────────────────────────────────────────────────────────────────────

    /// `GET /user/get-user-rags/{user_id}`.
    pub async fn list_rags(&self, user_id: &str, cookie_header: &str) -> Result<Vec<Rag>> {
        let rb = self.http.get(self.url(&format!("/user/get-user-rags/{user_id}")));
        let response = self.forward(rb, cookie_header).send().await?;
        Self::json(response).await
    }

    /// `GET /user/get-rag-info/{rag_id}`.
    pub async fn get_rag(&self, rag_id: &str, cookie_header: &str) -> Result<Rag> {
        let rb = self.http.get(self.url(&format!("/user/get-rag-info/{rag_id}")));
        let response = self.forward(rb, cookie_header).send().await?;
        Self::json(response).await
    }

    /// `POST /user/create/{user_id}`, relayed as-is.
    pub async fn create_rag(
        &self,
        user_id: &str,
        rag: &RagCreate,
        cookie_header: &str,
    ) -> Result<Upstream> {
        let rb = self
            .http
            .post(self.url(&format!("/user/create/{user_id}")))
            .json(rag);
        let response = self.forward(rb, cookie_header).send().await?;
        Upstream::read(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chat
    // ─────────────────────────────────────────────────────────────────────────

    /// `POST /rag/ask/stream`. The body is left unread for the caller to stream.
    pub async fn ask_stream(
        &self,
        request: &AskRequest,
        cookie_header: &str,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let rb = self.http.post(self.url("/rag/ask/stream")).json(request);
        self.forward(rb, cookie_header).send().await
    }

    async fn json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(Error::Api { status, message })
        }
    }
}

/// Value of the cookie named `name` in a raw `Cookie` header, if non-empty.
pub fn session_token(cookie_header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(cookie_header)
        .filter_map(std::result::Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Build a `Cookie` header carrying only the session cookie.
pub fn session_cookie_header(name: &str, token: &str) -> String {
    format!("{name}={token}")
}
