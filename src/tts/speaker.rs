use super::{SpeechSynthesizer, VoiceConfig};
use crate::error::{AgentError, Result};
use audio::{AudioSink, ContainerFormat};
use std::path::Path;

/// Something to speak: one text, or fragments produced lazily.
pub enum Utterance<'a> {
    Text(String),
    Fragments(Box<dyn Iterator<Item = Result<String>> + 'a>),
}

impl From<&str> for Utterance<'_> {
    fn from(text: &str) -> Self {
        Utterance::Text(text.to_string())
    }
}

/// Synthesizes text and plays it, one clip at a time.
pub struct Speaker<S, P> {
    synthesizer: S,
    sink: P,
}

impl<S: SpeechSynthesizer, P: AudioSink> Speaker<S, P> {
    pub fn new(synthesizer: S, sink: P) -> Self {
        Self { synthesizer, sink }
    }

    /// Speak `utterance`, blocking until playback of the last clip ends.
    ///
    /// Fragments are played in order; fragment N has finished playing before
    /// fragment N+1 is pulled. Blank text is skipped.
    pub fn say(&self, utterance: Utterance<'_>, voice: &VoiceConfig) -> Result<()> {
        let format = voice.audio_encoding.container_format()?;

        match utterance {
            Utterance::Text(text) => self.speak(&text, voice, format),
            Utterance::Fragments(fragments) => {
                for fragment in fragments {
                    self.speak(&fragment?, voice, format)?;
                }
                Ok(())
            }
        }
    }

    /// Synthesize `text` and write the encoded audio to `path`.
    pub fn save(&self, text: &str, voice: &VoiceConfig, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let audio = self.synthesizer.synthesize(text, voice)?;
        std::fs::write(path, &audio).map_err(AgentError::Io)?;
        log::info!("💾 Saved {} bytes of speech to {}", audio.len(), path.display());
        Ok(())
    }

    fn speak(&self, text: &str, voice: &VoiceConfig, format: ContainerFormat) -> Result<()> {
        if text.trim().is_empty() {
            log::debug!("Empty text, skipping TTS");
            return Ok(());
        }
        log::info!("🔊 Speaking: '{}'", text);
        let clip = self.synthesizer.synthesize(text, voice)?;
        self.sink.play(&clip, format)?;
        Ok(())
    }
}
