//! Voice chat with an LLM.
//!
//! Microphone audio is captured by the [`audio`] crate, transcribed through a
//! streaming recognition session ([`stt`]), sent to a chat-completion model
//! ([`llm`]) and the reply is spoken back ([`tts`]). [`session`] wires the
//! pieces into the text and voice loops.

pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod stt;
pub mod tts;

pub use error::{AgentError, Result};
