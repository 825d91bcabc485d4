use super::{SpeechSynthesizer, TtsError, VoiceConfig};
use crate::config::{ApiConfig, GoogleAuth};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;

pub const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

impl From<ureq::Error> for TtsError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                TtsError::ApiError { status, message }
            }
            ureq::Error::Transport(transport) => TtsError::Request(transport.to_string()),
        }
    }
}

/// Google Cloud Text-to-Speech over its REST API.
pub struct GoogleTts {
    agent: ureq::Agent,
    endpoint: String,
    auth: GoogleAuth,
}

impl GoogleTts {
    pub fn new(auth: GoogleAuth) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();
        Self {
            agent,
            endpoint: SYNTHESIZE_URL.to_string(),
            auth,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.google_auth())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(text: &str, voice: &VoiceConfig) -> Value {
        json!({
            "input": { "text": text },
            "voice": {
                "languageCode": voice.language_code,
                "ssmlGender": voice.gender.as_ref()
            },
            "audioConfig": { "audioEncoding": voice.audio_encoding.as_ref() }
        })
    }

    fn decode_audio(body: &Value) -> Result<Vec<u8>, TtsError> {
        let encoded = body["audioContent"]
            .as_str()
            .ok_or_else(|| TtsError::ParseError("Missing field: audioContent".to_string()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| TtsError::ParseError(format!("Base64 decode error: {}", e)))
    }
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, TtsError> {
        log::debug!(
            "🔊 Synthesizing {} chars ({}, {})",
            text.chars().count(),
            voice.language_code,
            voice.audio_encoding
        );

        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json");
        if let Some(key) = self.auth.api_key() {
            request = request.query("key", key);
        }
        if let Some(token) = self.auth.bearer_token() {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let body: Value = request
            .send_json(Self::payload(text, voice))?
            .into_json()
            .map_err(|e| TtsError::ParseError(format!("Invalid JSON: {}", e)))?;

        let audio = Self::decode_audio(&body)?;
        log::debug!("🔊 Received {} bytes of audio", audio.len());
        Ok(audio)
    }
}
