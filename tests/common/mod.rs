#![allow(dead_code)]

use audio::{AudioSink, ContainerFormat};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use voice_chat::llm::{ChatBackend, ChatDelta, ChatError, ChatReply, DeltaStream, Message};
use voice_chat::stt::{
    Alternative, RecognitionService, RecognitionSession, RecognizeRequest, RecognizeResponse,
    StreamingConfig, StreamingResult, SttError,
};
use voice_chat::tts::{SpeechSynthesizer, TtsError, VoiceConfig};

// ---- chat ----

pub enum Scripted {
    Reply(ChatReply),
    Stream(Vec<Result<ChatDelta, ChatError>>),
}

pub fn reply(role: &str, content: &str) -> Scripted {
    Scripted::Reply(ChatReply {
        role: role.to_string(),
        content: content.to_string(),
    })
}

pub fn role_delta(role: &str) -> Result<ChatDelta, ChatError> {
    Ok(ChatDelta {
        role: Some(role.to_string()),
        content: None,
    })
}

pub fn content_delta(content: &str) -> Result<ChatDelta, ChatError> {
    Ok(ChatDelta {
        role: None,
        content: Some(content.to_string()),
    })
}

/// Every (model, messages) pair a [`ScriptedBackend`] was called with.
pub type RequestLog = Rc<RefCell<Vec<(String, Vec<Message>)>>>;

/// Chat backend that answers from a script and records what it was sent.
pub struct ScriptedBackend {
    script: RefCell<VecDeque<Scripted>>,
    requests: RequestLog,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Handle on the request log that outlives moving the backend.
    pub fn requests(&self) -> RequestLog {
        self.requests.clone()
    }

    fn next(&self, model: &str, messages: &[Message]) -> Scripted {
        self.requests
            .borrow_mut()
            .push((model.to_string(), messages.to_vec()));
        self.script
            .borrow_mut()
            .pop_front()
            .expect("backend called more often than scripted")
    }
}

impl ChatBackend for ScriptedBackend {
    fn complete(&self, model: &str, messages: &[Message]) -> Result<ChatReply, ChatError> {
        match self.next(model, messages) {
            Scripted::Reply(reply) => Ok(reply),
            Scripted::Stream(_) => panic!("expected a streaming call"),
        }
    }

    fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<DeltaStream, ChatError> {
        match self.next(model, messages) {
            Scripted::Stream(deltas) => Ok(Box::new(deltas.into_iter())),
            Scripted::Reply(_) => panic!("expected a non-streaming call"),
        }
    }
}

// ---- speech ----

/// Shared, ordered record of what the synthesizer and sink did.
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub struct RecordingSynth {
    pub events: EventLog,
}

impl SpeechSynthesizer for RecordingSynth {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, TtsError> {
        self.events
            .borrow_mut()
            .push(format!("synth:{}:{}", voice.audio_encoding, text));
        Ok(text.as_bytes().to_vec())
    }
}

pub struct RecordingSink {
    pub events: EventLog,
}

impl AudioSink for RecordingSink {
    fn play(&self, clip: &[u8], format: ContainerFormat) -> audio::Result<()> {
        self.events.borrow_mut().push(format!(
            "play:{}:{}",
            format,
            String::from_utf8_lossy(clip)
        ));
        Ok(())
    }
}

// ---- recognition ----

pub fn response(transcript: &str, is_final: bool) -> RecognizeResponse {
    RecognizeResponse {
        results: vec![StreamingResult {
            alternatives: vec![Alternative {
                transcript: transcript.to_string(),
                confidence: 0.9,
            }],
            is_final,
            stability: 0.0,
        }],
    }
}

/// How a scripted session ends.
#[derive(Clone, Copy, Debug)]
pub enum Expiry {
    Never,
    /// Refuse the send after this many accepted requests.
    OnSendAfter(usize),
    /// Fail the poll after this many accepted requests.
    OnPollAfter(usize),
}

/// Recognizer that transcribes each request as its UTF-8 text. Every
/// request yields an empty response, an interim result and a final result.
pub struct ScriptedRecognizer {
    expiries: RefCell<VecDeque<Expiry>>,
    pub opened: RefCell<Vec<StreamingConfig>>,
    pub received: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl ScriptedRecognizer {
    pub fn new(expiries: Vec<Expiry>) -> Self {
        Self {
            expiries: RefCell::new(expiries.into()),
            opened: RefCell::new(Vec::new()),
            received: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

pub struct ScriptedSession {
    expiry: Expiry,
    accepted: usize,
    pending: Vec<RecognizeResponse>,
    received: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl RecognitionService for &ScriptedRecognizer {
    type Session = ScriptedSession;

    fn open(&self, config: &StreamingConfig) -> Result<ScriptedSession, SttError> {
        self.opened.borrow_mut().push(config.clone());
        let expiry = self.expiries.borrow_mut().pop_front().unwrap_or(Expiry::Never);
        Ok(ScriptedSession {
            expiry,
            accepted: 0,
            pending: Vec::new(),
            received: self.received.clone(),
        })
    }
}

impl RecognitionSession for ScriptedSession {
    fn send(&mut self, request: &RecognizeRequest) -> Result<(), SttError> {
        if let Expiry::OnSendAfter(limit) = self.expiry {
            if self.accepted >= limit {
                return Err(SttError::SessionExpired);
            }
        }
        self.accepted += 1;
        self.received
            .borrow_mut()
            .push(request.audio_content.clone());

        let text = String::from_utf8_lossy(&request.audio_content).to_string();
        let partial: String = text.chars().take(1).collect();
        self.pending.push(RecognizeResponse::default());
        self.pending.push(response(&partial, false));
        self.pending.push(response(&text, true));
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<RecognizeResponse>, SttError> {
        if let Expiry::OnPollAfter(limit) = self.expiry {
            if self.accepted >= limit {
                self.pending.clear();
                return Err(SttError::SessionExpired);
            }
        }
        Ok(std::mem::take(&mut self.pending))
    }

    fn finish(&mut self) -> Result<Vec<RecognizeResponse>, SttError> {
        Ok(std::mem::take(&mut self.pending))
    }
}
