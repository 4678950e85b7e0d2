//! Streaming answer client.
//!
//! The backend answers `POST /rag/ask/stream` with a raw UTF-8 token stream:
//! no framing, no delimiters, terminated by connection close. [`AnswerClient`]
//! turns that body into a pull-based [`AnswerStream`] of decoded text
//! fragments.

use std::pin::Pin;

use axum::http::StatusCode;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::decoder::Utf8StreamDecoder;
use crate::backend::{AskRequest, BackendClient};

/// Why an answer did not complete.
#[derive(Error, Debug)]
pub enum AnswerError {
    /// The request could not be sent or no response arrived.
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    /// The backend refused the question.
    #[error("{} {}", .status.as_u16(), .status.canonical_reason().unwrap_or_default())]
    Status { status: StatusCode },

    /// The body failed part-way through.
    #[error("{0}")]
    Read(#[source] reqwest::Error),

    /// The asker stopped the answer.
    #[error("cancelled")]
    Cancelled,
}

impl AnswerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Inline text shown in place of the answer.
    pub fn user_message(&self) -> String {
        format!("Error: {self}")
    }
}

/// Finite, non-restartable sequence of answer fragments in arrival order.
///
/// Dropping the stream aborts the underlying transfer.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String, AnswerError>> + Send>>;

/// Client for the streaming answer endpoint.
#[derive(Debug, Clone)]
pub struct AnswerClient {
    backend: BackendClient,
    cookie_header: String,
}

impl AnswerClient {
    /// `cookie_header` is sent with every question so the backend can
    /// authorize it.
    pub fn new(backend: BackendClient, cookie_header: impl Into<String>) -> Self {
        Self {
            backend,
            cookie_header: cookie_header.into(),
        }
    }

    /// Send one question and return its fragments.
    ///
    /// Fails before reading any body when the request cannot be sent, the
    /// backend answers with a non-success status, or `cancel` fires first.
    pub async fn ask(
        &self,
        request: &AskRequest,
        cancel: CancellationToken,
    ) -> Result<AnswerStream, AnswerError> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnswerError::Cancelled),
            sent = self.backend.ask_stream(request, &self.cookie_header) => {
                sent.map_err(AnswerError::Transport)?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(AnswerError::Status { status });
        }

        Ok(fragments(response, cancel))
    }
}

/// Decode a response body into text fragments until it ends or `cancel` fires.
pub fn fragments(response: reqwest::Response, cancel: CancellationToken) -> AnswerStream {
    let out = async_stream::try_stream! {
        let body = response.bytes_stream();
        futures::pin_mut!(body);
        let mut decoder = Utf8StreamDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(AnswerError::Cancelled),
                chunk = body.next() => Ok(chunk),
            }?;

            match next {
                Some(chunk) => {
                    let chunk = chunk.map_err(AnswerError::Read)?;
                    let text = decoder.decode(&chunk);
                    if !text.is_empty() {
                        yield text;
                    }
                }
                None => {
                    let tail = decoder.finish();
                    if !tail.is_empty() {
                        yield tail;
                    }
                    break;
                }
            }
        }
    };

    Box::pin(out)
}
