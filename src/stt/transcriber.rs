use super::{
    RecognitionService, RecognitionSession, RecognizeRequest, RecognizeResponse, StreamingConfig,
    SttError,
};
use std::collections::VecDeque;

/// Reconnects allowed in a row without a single accepted request.
const MAX_CONSECUTIVE_RECONNECTS: usize = 3;

enum Phase<S> {
    /// About to open a session (also the initial state).
    Reconnecting,
    Streaming(S),
    Finished,
}

/// Lazily transcribes a sequence of audio batches into final transcripts.
///
/// Pulling the next transcript sends audio until the session reports a final
/// result. When the session expires it is replaced transparently and the
/// batch that could not be sent is re-sent on the new one. The sequence ends
/// after the audio ends and the last session has been drained, or after the
/// first error.
pub struct StreamingTranscriber<R: RecognitionService, I> {
    service: R,
    config: StreamingConfig,
    chunks: I,
    phase: Phase<R::Session>,
    ready: VecDeque<String>,
    carry_over: Option<RecognizeRequest>,
    consecutive_reconnects: usize,
    sessions_opened: usize,
}

impl<R, I> StreamingTranscriber<R, I>
where
    R: RecognitionService,
    I: Iterator<Item = Vec<u8>>,
{
    pub fn new(service: R, config: StreamingConfig, chunks: I) -> Self {
        Self {
            service,
            config,
            chunks,
            phase: Phase::Reconnecting,
            ready: VecDeque::new(),
            carry_over: None,
            consecutive_reconnects: 0,
            sessions_opened: 0,
        }
    }

    /// Number of recognition sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened
    }

    fn absorb(&mut self, responses: Vec<RecognizeResponse>) {
        for response in responses {
            if let Some(transcript) = response.final_transcript() {
                log::debug!("📝 Final result: '{}'", transcript);
                self.ready.push_back(transcript.to_string());
            }
        }
    }

    fn open_session(&mut self) -> Result<R::Session, SttError> {
        if self.consecutive_reconnects > MAX_CONSECUTIVE_RECONNECTS {
            log::error!(
                "❌ Session expired {} times without progress",
                self.consecutive_reconnects
            );
            return Err(SttError::SessionExpired);
        }
        let session = self.service.open(&self.config)?;
        self.sessions_opened += 1;
        log::info!("🎙️ Recognition session {} opened", self.sessions_opened);
        Ok(session)
    }

    fn expire(&mut self) {
        self.consecutive_reconnects += 1;
        log::info!("🔄 Recognition session expired, reconnecting");
        self.phase = Phase::Reconnecting;
    }

    /// Advance one step: send a batch and poll, or finish the stream.
    fn step(&mut self, mut session: R::Session) -> Result<(), SttError> {
        let request = match self.carry_over.take() {
            Some(request) => Some(request),
            None => self.chunks.next().map(RecognizeRequest::new),
        };

        let Some(request) = request else {
            log::debug!("🔚 Audio ended, draining recognition session");
            let responses = match session.finish() {
                Ok(responses) => responses,
                Err(SttError::SessionExpired) => Vec::new(),
                Err(e) => return Err(e),
            };
            self.absorb(responses);
            self.phase = Phase::Finished;
            return Ok(());
        };

        match session.send(&request) {
            Ok(()) => {
                self.consecutive_reconnects = 0;
                log::trace!("📤 Sent {} bytes of audio", request.audio_content.len());
            }
            Err(SttError::SessionExpired) => {
                // Finals the server sent before ending the stream still count
                if let Ok(responses) = session.poll() {
                    self.absorb(responses);
                }
                self.carry_over = Some(request);
                self.expire();
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        match session.poll() {
            Ok(responses) => {
                self.absorb(responses);
                self.phase = Phase::Streaming(session);
            }
            Err(SttError::SessionExpired) => self.expire(),
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl<R, I> Iterator for StreamingTranscriber<R, I>
where
    R: RecognitionService,
    I: Iterator<Item = Vec<u8>>,
{
    type Item = Result<String, SttError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(transcript) = self.ready.pop_front() {
                return Some(Ok(transcript));
            }

            // Errors leave the phase at Finished
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return None,
                Phase::Reconnecting => match self.open_session() {
                    Ok(session) => self.phase = Phase::Streaming(session),
                    Err(e) => return Some(Err(e)),
                },
                Phase::Streaming(session) => {
                    if let Err(e) = self.step(session) {
                        log::warn!("❌ Transcription failed: {}", e);
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

impl<R, I> std::iter::FusedIterator for StreamingTranscriber<R, I>
where
    R: RecognitionService,
    I: Iterator<Item = Vec<u8>>,
{
}
