//! Streaming answers for the chat page and the `ask` command.

pub mod decoder;
pub mod stream;
pub mod view;

pub use decoder::Utf8StreamDecoder;
pub use stream::{AnswerClient, AnswerError, AnswerStream};
pub use view::{AnswerState, AskOutcome, ChatView};
