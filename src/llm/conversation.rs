use super::{ChatBackend, ChatError, DeltaStream, Message, Role};
use std::str::FromStr;

/// A chat session: an ordered message history and the backend it talks to.
///
/// Each send appends the user message, calls the backend with the whole
/// history and appends the reply. System messages are never trimmed.
pub struct Conversation<B> {
    backend: B,
    model: String,
    history: Vec<Message>,
    max_messages: Option<usize>,
}

impl<B: ChatBackend> Conversation<B> {
    pub fn new(backend: B, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            history: Vec::new(),
            max_messages: None,
        }
    }

    /// Seed the history with system messages, in order.
    pub fn with_system_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.history.extend(messages.into_iter().map(Message::system));
        self
    }

    /// Keep at most `max` non-system messages, dropping the oldest first.
    /// Values below 2 are raised to 2 so the latest exchange survives.
    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = Some(max.max(2));
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `text` and wait for the whole reply.
    pub fn send(&mut self, text: &str) -> Result<String, ChatError> {
        push_message(&mut self.history, self.max_messages, Message::user(text));
        log::debug!("🧠 Sending {} messages to {}", self.history.len(), self.model);

        let reply = self.backend.complete(&self.model, &self.history)?;
        let role = Role::from_str(&reply.role).map_err(|_| ChatError::UnknownRole(reply.role))?;

        push_message(
            &mut self.history,
            self.max_messages,
            Message::new(role, reply.content.clone()),
        );
        Ok(reply.content)
    }

    /// Send `text` and stream the reply as content fragments.
    ///
    /// The assembled reply is appended to the history once the stream is
    /// exhausted. A stream dropped before the end appends nothing.
    pub fn send_streaming(&mut self, text: &str) -> Result<ReplyStream<'_>, ChatError> {
        push_message(&mut self.history, self.max_messages, Message::user(text));
        log::debug!(
            "🧠 Streaming {} messages to {}",
            self.history.len(),
            self.model
        );

        let deltas = self.backend.complete_stream(&self.model, &self.history)?;
        Ok(ReplyStream {
            history: &mut self.history,
            max_messages: self.max_messages,
            deltas,
            role: None,
            content: String::new(),
            done: false,
        })
    }
}

fn push_message(history: &mut Vec<Message>, max_messages: Option<usize>, message: Message) {
    history.push(message);
    let Some(max) = max_messages else {
        return;
    };
    let mut excess = history
        .iter()
        .filter(|m| m.role != Role::System)
        .count()
        .saturating_sub(max);
    if excess == 0 {
        return;
    }
    history.retain(|m| {
        if excess > 0 && m.role != Role::System {
            excess -= 1;
            false
        } else {
            true
        }
    });
}

/// Lazy content fragments of a streamed reply.
pub struct ReplyStream<'a> {
    history: &'a mut Vec<Message>,
    max_messages: Option<usize>,
    deltas: DeltaStream,
    role: Option<Role>,
    content: String,
    done: bool,
}

impl ReplyStream<'_> {
    fn finish(&mut self) {
        let role = self.role.unwrap_or_else(|| {
            log::warn!("⚠️ Streamed reply carried no role, assuming assistant");
            Role::Assistant
        });
        let content = std::mem::take(&mut self.content);
        log::debug!("🧠 Streamed reply complete ({} chars)", content.chars().count());
        push_message(self.history, self.max_messages, Message::new(role, content));
    }
}

impl Iterator for ReplyStream<'_> {
    type Item = Result<String, ChatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.deltas.next() {
                Some(Ok(delta)) => {
                    if let Some(role) = delta.role {
                        if self.role.is_none() {
                            match Role::from_str(&role) {
                                Ok(parsed) => self.role = Some(parsed),
                                Err(_) => {
                                    self.done = true;
                                    return Some(Err(ChatError::UnknownRole(role)));
                                }
                            }
                        }
                    }
                    if let Some(fragment) = delta.content {
                        if !fragment.is_empty() {
                            self.content.push_str(&fragment);
                            return Some(Ok(fragment));
                        }
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    self.finish();
                    return None;
                }
            }
        }
    }
}

impl std::iter::FusedIterator for ReplyStream<'_> {}
