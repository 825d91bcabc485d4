use super::{ChatBackend, ChatDelta, ChatError, ChatReply, DeltaStream, Message};
use crate::config::{ApiConfig, ConfigError};
use secrecy::{ExposeSecret, SecretBox};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader};
use std::time::Duration;

impl From<ureq::Error> for ChatError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                ChatError::ApiError { status, message }
            }
            ureq::Error::Transport(transport) => ChatError::Request(transport.to_string()),
        }
    }
}

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: SecretBox<String>,
    base_url: String,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();

        Self {
            agent,
            api_key: SecretBox::new(Box::new(api_key.into())),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature: None,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.openai_key()?, config.openai_base_url.clone()))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn payload(&self, model: &str, messages: &[Message], stream: bool) -> Value {
        let messages_json: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_ref(),
                    "content": msg.content
                })
            })
            .collect();

        let mut payload = json!({
            "model": model,
            "messages": messages_json,
            "stream": stream
        });

        if let Some(temperature) = self.temperature {
            payload["temperature"] = json!(temperature);
        }

        payload
    }

    fn post(&self, payload: Value) -> Result<ureq::Response, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("🧠 POST {}", url);

        let response = self
            .agent
            .post(&url)
            .set(
                "Authorization",
                &format!("Bearer {}", self.api_key.expose_secret()),
            )
            .set("Content-Type", "application/json")
            .send_json(payload)?;
        Ok(response)
    }

    /// Parse a non-streaming chat completion body.
    pub fn parse_response(body: &Value) -> Result<ChatReply, ChatError> {
        let message = body["choices"]
            .get(0)
            .map(|choice| &choice["message"])
            .ok_or_else(|| ChatError::ParseError("Missing 'choices[0]'".to_string()))?;

        let role = message["role"]
            .as_str()
            .ok_or_else(|| ChatError::ParseError("Missing message role".to_string()))?
            .to_string();

        let content = message["content"].as_str().unwrap_or("").to_string();

        Ok(ChatReply { role, content })
    }
}

impl ChatBackend for OpenAiClient {
    fn complete(&self, model: &str, messages: &[Message]) -> Result<ChatReply, ChatError> {
        let response = self.post(self.payload(model, messages, false))?;
        let body: Value = response
            .into_json()
            .map_err(|e| ChatError::ParseError(format!("Invalid JSON: {}", e)))?;
        Self::parse_response(&body)
    }

    fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<DeltaStream, ChatError> {
        let response = self.post(self.payload(model, messages, true))?;
        let reader = BufReader::new(response.into_reader());
        Ok(Box::new(SseDeltas::new(reader)))
    }
}

/// Server-Sent Events body of a streamed chat completion, as deltas.
///
/// Ends at `data: [DONE]` or end of body. Fused after the end or the
/// first error.
pub struct SseDeltas<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> SseDeltas<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }

    fn parse_event(data: &str) -> Result<Option<ChatDelta>, ChatError> {
        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| ChatError::ParseError(format!("Invalid stream chunk: {}", e)))?;

        if let Some(error) = chunk.get("error") {
            return Err(ChatError::ApiError {
                status: error["code"].as_u64().unwrap_or(0) as u16,
                message: error["message"].as_str().unwrap_or("stream error").to_string(),
            });
        }

        let delta = &chunk["choices"][0]["delta"];
        let role = delta["role"].as_str().map(str::to_string);
        let content = delta["content"].as_str().map(str::to_string);

        if role.is_none() && content.is_none() {
            return Ok(None);
        }
        Ok(Some(ChatDelta { role, content }))
    }
}

impl<R: BufRead> Iterator for SseDeltas<R> {
    type Item = Result<ChatDelta, ChatError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    let line = self.line.trim_end();
                    let Some(data) = line.strip_prefix("data:") else {
                        // Blank separators, comments, event names
                        continue;
                    };
                    let data = data.trim_start();
                    if data == "[DONE]" {
                        self.finished = true;
                        break;
                    }
                    match Self::parse_event(data) {
                        Ok(Some(delta)) => return Some(Ok(delta)),
                        Ok(None) => continue,
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(ChatError::Io(e)));
                }
            }
        }
        None
    }
}

impl<R: BufRead> std::iter::FusedIterator for SseDeltas<R> {}
