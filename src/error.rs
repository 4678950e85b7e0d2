//! Error types shared by the backend client and the HTTP handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Portal error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend could not be reached or the transfer failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid backend URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Error message from the backend.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for portal operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Status code reported to the browser for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Api { status, .. } => *status,
            Self::InvalidUrl(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for showing to the user.
    ///
    /// Backend errors carry a FastAPI-style `{"detail": "..."}` body; when
    /// present the detail text is used instead of the raw body.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => serde_json::from_str::<serde_json::Value>(message)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or_else(|| message.clone()),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(name: "portal.error", error = %self, "request failed");
        }
        (
            status,
            Json(serde_json::json!({ "detail": self.user_message() })),
        )
            .into_response()
    }
}
