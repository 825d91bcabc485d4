//! Text-to-speech: voice selection, synthesis and playback.

pub mod google;
pub mod speaker;

pub use google::GoogleTts;
pub use speaker::{Speaker, Utterance};

use audio::ContainerFormat;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
    #[error("Unsupported audio encoding for playback: {0}")]
    UnsupportedEncoding(AudioEncoding),
    #[error("Failed to save audio: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(ascii_case_insensitive)]
pub enum SsmlGender {
    #[strum(serialize = "MALE")]
    Male,
    #[strum(serialize = "FEMALE")]
    Female,
    #[strum(serialize = "NEUTRAL")]
    Neutral,
    #[strum(serialize = "SSML_VOICE_GENDER_UNSPECIFIED")]
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
#[strum(ascii_case_insensitive)]
pub enum AudioEncoding {
    #[strum(serialize = "LINEAR16")]
    Linear16,
    #[strum(serialize = "MP3")]
    Mp3,
    #[strum(serialize = "OGG_OPUS")]
    OggOpus,
    #[strum(serialize = "MULAW")]
    Mulaw,
    #[strum(serialize = "ALAW")]
    Alaw,
}

impl AudioEncoding {
    /// Container the sink needs to play this encoding.
    pub fn container_format(self) -> Result<ContainerFormat, TtsError> {
        match self {
            AudioEncoding::Linear16 => Ok(ContainerFormat::Wav),
            AudioEncoding::Mp3 => Ok(ContainerFormat::Mp3),
            other => Err(TtsError::UnsupportedEncoding(other)),
        }
    }
}

/// Voice parameters for a whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    pub language_code: String,
    pub gender: SsmlGender,
    pub audio_encoding: AudioEncoding,
}

impl VoiceConfig {
    pub fn new(
        language_code: impl Into<String>,
        gender: SsmlGender,
        audio_encoding: AudioEncoding,
    ) -> Self {
        Self {
            language_code: language_code.into(),
            gender,
            audio_encoding,
        }
    }
}

/// Turns text into encoded audio.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, TtsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_encoding_names() {
        assert_eq!(AudioEncoding::Linear16.as_ref(), "LINEAR16");
        assert_eq!(AudioEncoding::OggOpus.to_string(), "OGG_OPUS");
        assert_eq!(AudioEncoding::from_str("linear16").unwrap(), AudioEncoding::Linear16);
        assert_eq!(AudioEncoding::from_str("Mp3").unwrap(), AudioEncoding::Mp3);
        assert!(AudioEncoding::from_str("flac").is_err());
    }

    #[test]
    fn test_gender_names() {
        assert_eq!(SsmlGender::from_str("female").unwrap(), SsmlGender::Female);
        assert_eq!(SsmlGender::Neutral.as_ref(), "NEUTRAL");
    }

    #[test]
    fn test_container_selection() {
        assert_eq!(
            AudioEncoding::Linear16.container_format().unwrap(),
            ContainerFormat::Wav
        );
        assert_eq!(AudioEncoding::Mp3.container_format().unwrap(), ContainerFormat::Mp3);
        for encoding in [AudioEncoding::OggOpus, AudioEncoding::Mulaw, AudioEncoding::Alaw] {
            assert!(matches!(
                encoding.container_format(),
                Err(TtsError::UnsupportedEncoding(e)) if e == encoding
            ));
        }
    }
}
