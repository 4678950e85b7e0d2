use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::stream::{AnswerClient, AnswerError};
use crate::backend::{AskRequest, Rag};

/// What the chat view shows for the current answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerState {
    pub text: String,
    pub loading: bool,
    pub error: Option<String>,
}

impl AnswerState {
    /// The error replaces the answer text when present.
    pub fn displayed(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.text)
    }
}

/// How a call to [`ChatView::ask`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Empty query or no active RAG; nothing was sent.
    Ignored,
    /// Another answer is still in flight; nothing was sent.
    Busy,
    Completed,
    /// Stopped by [`ChatView::stop`].
    Cancelled,
    /// The answer failed; the message is also in [`AnswerState::error`].
    Failed(String),
}

/// Holds the view's single in-flight slot.
///
/// Dropping it, on completion or when the `ask` future itself is dropped,
/// cancels the transfer, frees the slot and clears `loading`.
struct InFlight<'a> {
    view: &'a ChatView,
    _cancel: DropGuard,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.view
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.view
            .state
            .send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

/// Chat view state for one RAG conversation.
///
/// Holds at most one in-flight answer. Observers follow progress through
/// [`ChatView::subscribe`].
#[derive(Debug)]
pub struct ChatView {
    client: AnswerClient,
    state: watch::Sender<AnswerState>,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl ChatView {
    pub fn new(client: AnswerClient) -> Self {
        let (state, _) = watch::channel(AnswerState::default());
        Self {
            client,
            state,
            in_flight: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AnswerState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AnswerState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Ask `query` against `rag` and stream the answer into the view state.
    pub async fn ask(&self, query: &str, rag: Option<&Rag>) -> AskOutcome {
        let query = query.trim();
        let Some(rag) = rag else {
            return AskOutcome::Ignored;
        };
        if query.is_empty() {
            return AskOutcome::Ignored;
        }

        let cancel = CancellationToken::new();
        {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return AskOutcome::Busy;
            }
            *slot = Some(cancel.clone());
        }
        let in_flight = InFlight {
            view: self,
            _cancel: cancel.clone().drop_guard(),
        };

        self.state.send_modify(|s| {
            s.text.clear();
            s.error = None;
            s.loading = true;
        });

        let started = Instant::now();
        let request = AskRequest::for_rag(query, rag);
        let result = self.run(&request, cancel).await;

        let outcome = match result {
            Ok(()) => AskOutcome::Completed,
            Err(AnswerError::Cancelled) => AskOutcome::Cancelled,
            Err(e) => AskOutcome::Failed(e.user_message()),
        };

        self.state.send_modify(|s| {
            s.loading = false;
            if let AskOutcome::Failed(message) = &outcome {
                s.error = Some(message.clone());
            }
        });
        drop(in_flight);

        tracing::info!(
            name: "chat.answer.finished",
            rag_id = %rag.id,
            outcome = ?outcome,
            chars = self.state.borrow().text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Answer finished"
        );

        outcome
    }

    async fn run(&self, request: &AskRequest, cancel: CancellationToken) -> Result<(), AnswerError> {
        let mut fragments = self.client.ask(request, cancel).await?;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            self.state.send_modify(|s| s.text.push_str(&fragment));
        }
        Ok(())
    }

    /// Abort the in-flight answer, if any. Text received so far is kept.
    pub fn stop(&self) {
        if let Some(token) = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }
        self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}
