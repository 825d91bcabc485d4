//! The text and voice conversation loops.

use crate::error::Result;
use crate::llm::{ChatBackend, Conversation};
use crate::stt::SttError;
use crate::tts::{SpeechSynthesizer, Speaker, Utterance, VoiceConfig};
use audio::AudioSink;
use regex::Regex;
use std::io::{BufRead, Write};

pub const DEFAULT_EXIT_PHRASES: &[&str] = &["終了", "停止", "終わり", "exit", "quit", "goodbye"];

/// Spoken phrases that end the voice loop.
///
/// Matching is case-insensitive and whole-word, where a word boundary is
/// anything that is not an ASCII word character. Japanese text has no
/// spaces, so "これで終了します" contains the phrase "終了".
#[derive(Debug, Clone)]
pub struct ExitPhrases {
    pattern: Regex,
}

impl ExitPhrases {
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> std::result::Result<Self, regex::Error> {
        let alternatives = phrases
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(
            r"(?i)(?:^|[^A-Za-z0-9_])(?:{})(?:$|[^A-Za-z0-9_])",
            alternatives
        ))?;
        Ok(Self { pattern })
    }

    pub fn is_exit(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

impl Default for ExitPhrases {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_PHRASES).expect("escaped exit phrases form a valid pattern")
    }
}

/// Read lines from `input` and chat until a blank line or end of input.
pub fn run_text_chat<B, R, W>(
    conversation: &mut Conversation<B>,
    mut input: R,
    out: &mut W,
    streaming: bool,
) -> Result<()>
where
    B: ChatBackend,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(out, "user: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            log::info!("👋 Empty input, ending chat");
            break;
        }

        if streaming {
            write!(out, "assistant: ")?;
            for fragment in conversation.send_streaming(text)? {
                write!(out, "{}", fragment?)?;
                out.flush()?;
            }
            writeln!(out)?;
        } else {
            let reply = conversation.send(text)?;
            writeln!(out, "assistant: {}", reply)?;
        }
    }
    Ok(())
}

/// Chat over transcripts until an exit phrase is heard or the transcripts end.
///
/// Each transcript is printed, sent to the conversation and the reply is
/// printed and spoken. With `streaming`, fragments are printed and spoken as
/// they arrive.
#[allow(clippy::too_many_arguments)]
pub fn run_voice_chat<T, B, S, P, W>(
    transcripts: T,
    conversation: &mut Conversation<B>,
    speaker: &Speaker<S, P>,
    voice: &VoiceConfig,
    out: &mut W,
    exit: &ExitPhrases,
    streaming: bool,
) -> Result<()>
where
    T: IntoIterator<Item = std::result::Result<String, SttError>>,
    B: ChatBackend,
    S: SpeechSynthesizer,
    P: AudioSink,
    W: Write,
{
    write!(out, "user: ")?;
    out.flush()?;

    for transcript in transcripts {
        let transcript = transcript?;
        let text = transcript.trim();
        if text.is_empty() {
            continue;
        }
        writeln!(out, "{}", text)?;

        if exit.is_exit(text) {
            log::info!("👋 Exit phrase heard: '{}'", text);
            writeln!(out, "Exiting..")?;
            return Ok(());
        }

        write!(out, "assistant: ")?;
        out.flush()?;
        if streaming {
            let stream = conversation.send_streaming(text)?;
            let printed = stream.map(|fragment| -> Result<String> {
                let fragment = fragment?;
                write!(out, "{}", fragment)?;
                out.flush()?;
                Ok(fragment)
            });
            speaker.say(Utterance::Fragments(Box::new(printed)), voice)?;
            writeln!(out)?;
        } else {
            let reply = conversation.send(text)?;
            writeln!(out, "{}", reply)?;
            speaker.say(Utterance::Text(reply), voice)?;
        }

        write!(out, "user: ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}
