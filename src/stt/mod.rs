//! Streaming speech recognition.
//!
//! [`StreamingTranscriber`] turns a sequence of audio batches into final
//! transcripts, reopening the recognition session whenever the remote side
//! ends it for running too long.

pub mod transcriber;
pub mod ws;

pub use transcriber::StreamingTranscriber;
pub use ws::WsRecognitionService;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SttError {
    #[error("WebSocket connection failed: {0}")]
    Connection(String),
    #[error("WebSocket error: {0}")]
    WebSocket(String),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Recognition session exceeded its maximum duration")]
    SessionExpired,
    #[error("API error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
}

/// Parameters sent when a recognition session is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub interim_results: bool,
}

impl StreamingConfig {
    /// LINEAR16 audio at `sample_rate_hertz`, interim results on.
    pub fn linear16(sample_rate_hertz: u32, language_code: impl Into<String>) -> Self {
        Self {
            encoding: "LINEAR16".to_string(),
            sample_rate_hertz,
            language_code: language_code.into(),
            interim_results: true,
        }
    }
}

/// One batch of audio for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizeRequest {
    pub audio_content: Vec<u8>,
}

impl RecognizeRequest {
    pub fn new(audio_content: Vec<u8>) -> Self {
        Self { audio_content }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecognizeResponse {
    pub results: Vec<StreamingResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamingResult {
    pub alternatives: Vec<Alternative>,
    pub is_final: bool,
    pub stability: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f32,
}

impl RecognizeResponse {
    /// The transcript of the top result, if it is final.
    pub fn final_transcript(&self) -> Option<&str> {
        let result = self.results.first()?;
        if !result.is_final {
            return None;
        }
        result.alternatives.first().map(|alt| alt.transcript.as_str())
    }
}

/// Opens streaming recognition sessions.
pub trait RecognitionService {
    type Session: RecognitionSession;

    fn open(&self, config: &StreamingConfig) -> Result<Self::Session, SttError>;
}

/// One open recognition stream.
///
/// `SttError::SessionExpired` from `send` or `poll` means the remote side
/// ended the session and a new one should be opened. A request whose send
/// failed was not accepted. `poll` keeps returning results that arrived
/// before the end until they have all been handed out.
pub trait RecognitionSession {
    fn send(&mut self, request: &RecognizeRequest) -> Result<(), SttError>;

    /// Responses that have arrived so far, without blocking.
    fn poll(&mut self) -> Result<Vec<RecognizeResponse>, SttError>;

    /// Signal end of audio and collect every remaining response.
    fn finish(&mut self) -> Result<Vec<RecognizeResponse>, SttError>;
}
