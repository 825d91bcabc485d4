pub mod client;
pub mod conversation;
pub mod message;

pub use client::{OpenAiClient, SseDeltas};
pub use conversation::{Conversation, ReplyStream};
pub use message::{Message, Role};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
    #[error("Unknown message role: {0}")]
    UnknownRole(String),
    #[error("I/O error while reading response: {0}")]
    Io(#[from] std::io::Error),
}

/// A complete reply from the chat backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub role: String,
    pub content: String,
}

/// One increment of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

pub type DeltaStream = Box<dyn Iterator<Item = Result<ChatDelta, ChatError>> + Send>;

/// An OpenAI-compatible chat completion service.
pub trait ChatBackend {
    fn complete(&self, model: &str, messages: &[Message]) -> Result<ChatReply, ChatError>;

    fn complete_stream(&self, model: &str, messages: &[Message])
        -> Result<DeltaStream, ChatError>;
}
