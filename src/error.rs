use crate::config::ConfigError;
use crate::llm::ChatError;
use crate::stt::SttError;
use crate::tts::TtsError;
use audio::AudioError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("STT error: {0}")]
    Stt(#[from] SttError),

    #[error("LLM error: {0}")]
    Chat(#[from] ChatError),

    #[error("TTS error: {0}")]
    Tts(#[from] TtsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
