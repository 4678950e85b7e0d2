//! Session validation against the backend's "who am I" endpoint.

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::backend::{BackendClient, CurrentUser};

/// Result of one session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The backend answered 2xx. The user is attached when the body parsed.
    Valid(Option<CurrentUser>),
    /// The backend answered with a non-success status.
    Invalid(StatusCode),
    /// The backend could not be asked (transport error or timeout).
    Unreachable(String),
}

/// Checks whether a forwarded cookie header carries a valid session.
///
/// Implementations never fail; every problem maps onto a [`SessionStatus`].
#[async_trait]
pub trait SessionValidator: Send + Sync + std::fmt::Debug {
    async fn validate(&self, cookie_header: &str) -> SessionStatus;
}

/// Validator backed by `GET /auth/me`.
#[derive(Debug, Clone)]
pub struct BackendSessionValidator {
    backend: BackendClient,
}

impl BackendSessionValidator {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl SessionValidator for BackendSessionValidator {
    async fn validate(&self, cookie_header: &str) -> SessionStatus {
        match self.backend.me(cookie_header).await {
            Ok(upstream) if upstream.status.is_success() => {
                let user = serde_json::from_slice::<CurrentUser>(&upstream.body)
                    .inspect_err(|e| {
                        tracing::debug!(error = %e, "session check body is not a user record");
                    })
                    .ok();
                SessionStatus::Valid(user)
            }
            Ok(upstream) => SessionStatus::Invalid(upstream.status),
            Err(e) => {
                tracing::warn!(
                    name: "backend.session_check.failed",
                    error = %e,
                    "Error validating session"
                );
                SessionStatus::Unreachable(e.to_string())
            }
        }
    }
}
