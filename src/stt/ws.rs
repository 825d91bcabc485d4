use super::{
    RecognitionService, RecognitionSession, RecognizeRequest, RecognizeResponse, StreamingConfig,
    SttError,
};
use crate::config::{ApiConfig, ConfigError, GoogleAuth};
use secrecy::{ExposeSecret, SecretBox};
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::header::AUTHORIZATION;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};
use url::Url;

/// How long `poll` waits for a frame before reporting "nothing yet".
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// gRPC status code for OUT_OF_RANGE, used when a stream runs too long.
const OUT_OF_RANGE: i64 = 11;

impl From<tungstenite::Error> for SttError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                SttError::SessionExpired
            }
            other => SttError::WebSocket(other.to_string()),
        }
    }
}

/// Streaming recognition over a WebSocket gateway speaking the Cloud Speech
/// JSON shapes.
pub struct WsRecognitionService {
    url: String,
    api_key: Option<SecretBox<String>>,
    bearer_token: Option<SecretBox<String>>,
}

impl WsRecognitionService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            bearer_token: None,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        let service = Self::new(config.speech_stream_url()?);
        Ok(match config.google_auth() {
            GoogleAuth::ApiKey(key) => service.with_api_key(key.expose_secret().as_str()),
            GoogleAuth::AccessToken(token) => {
                service.with_bearer_token(token.expose_secret().as_str())
            }
            GoogleAuth::None => service,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretBox::new(Box::new(key.into())));
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(SecretBox::new(Box::new(token.into())));
        self
    }

    fn endpoint(&self) -> Result<Url, SttError> {
        let mut url = Url::parse(&self.url)?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key.expose_secret());
        }
        Ok(url)
    }
}

impl RecognitionService for WsRecognitionService {
    type Session = WsSession;

    fn open(&self, config: &StreamingConfig) -> Result<WsSession, SttError> {
        let url = self.endpoint()?;
        log::info!("🌐 Connecting to speech stream: {}", self.url);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| SttError::Connection(format!("Invalid request: {}", e)))?;
        if let Some(token) = &self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| SttError::Connection(format!("Invalid bearer token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, response) = connect(request)
            .map_err(|e| SttError::Connection(format!("Connection failed: {}", e)))?;
        log::info!("✅ WebSocket connected, status: {}", response.status());

        let mut session = WsSession {
            ws,
            closed: false,
            pending: Vec::new(),
        };
        session.set_read_timeout(Some(POLL_TIMEOUT))?;
        session.send_text(&config_frame(config))?;
        Ok(session)
    }
}

/// First frame of every session.
pub fn config_frame(config: &StreamingConfig) -> Value {
    json!({
        "streamingConfig": {
            "config": {
                "encoding": config.encoding,
                "sampleRateHertz": config.sample_rate_hertz,
                "languageCode": config.language_code
            },
            "interimResults": config.interim_results
        }
    })
}

enum Incoming {
    Response(RecognizeResponse),
    Nothing,
    Closed,
}

/// Interpret one text frame from the gateway.
fn parse_frame(text: &str) -> Result<RecognizeResponse, SttError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SttError::ParseError(format!("Invalid JSON: {}", e)))?;

    if let Some(error) = value.get("error") {
        let code = error["code"].as_i64().unwrap_or(0);
        let status = error["status"].as_str().unwrap_or("");
        if code == OUT_OF_RANGE || status == "OUT_OF_RANGE" {
            return Err(SttError::SessionExpired);
        }
        return Err(SttError::Remote {
            code,
            message: error["message"].as_str().unwrap_or("unknown error").to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| SttError::ParseError(e.to_string()))
}

pub struct WsSession {
    ws: WebSocket<MaybeTlsStream<TcpStream>>,
    closed: bool,
    /// Responses read while checking for expiry before a send.
    pending: Vec<RecognizeResponse>,
}

impl WsSession {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), SttError> {
        let result = match self.ws.get_ref() {
            MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout),
            MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(timeout),
            _ => Ok(()),
        };
        result.map_err(|e| SttError::WebSocket(format!("Failed to set read timeout: {}", e)))
    }

    fn send_text(&mut self, value: &Value) -> Result<(), SttError> {
        self.ws.send(Message::Text(value.to_string()))?;
        Ok(())
    }

    fn read(&mut self) -> Result<Incoming, SttError> {
        match self.ws.read() {
            Ok(Message::Text(text)) => {
                log::debug!("📨 Received server message: {}", text);
                Ok(Incoming::Response(parse_frame(&text)?))
            }
            Ok(Message::Close(frame)) => {
                log::info!("🔚 Server closed recognition stream: {:?}", frame);
                self.closed = true;
                Ok(Incoming::Closed)
            }
            // Pings are answered by tungstenite on the next read or write
            Ok(_) => Ok(Incoming::Nothing),
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(Incoming::Nothing)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.closed = true;
                Ok(Incoming::Closed)
            }
            Err(e) => {
                log::warn!("❌ WebSocket read error: {}", e);
                Err(SttError::WebSocket(format!("Read failed: {}", e)))
            }
        }
    }

    /// Read every frame that has already arrived into `responses`.
    ///
    /// Returns true once the server has ended the session, either by closing
    /// it or with an expiry error. Results sent before the end are kept.
    fn drain(&mut self, responses: &mut Vec<RecognizeResponse>) -> Result<bool, SttError> {
        if self.closed {
            return Ok(true);
        }
        loop {
            match self.read() {
                Ok(Incoming::Response(response)) => responses.push(response),
                Ok(Incoming::Nothing) => return Ok(false),
                Ok(Incoming::Closed) => return Ok(true),
                Err(SttError::SessionExpired) => {
                    log::info!("⏱️ Recognition stream reached its duration limit");
                    self.closed = true;
                    return Ok(true);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl RecognitionSession for WsSession {
    fn send(&mut self, request: &RecognizeRequest) -> Result<(), SttError> {
        // Audio written after the server ended the stream would be lost
        let mut pending = std::mem::take(&mut self.pending);
        let ended = self.drain(&mut pending)?;
        self.pending = pending;
        if ended {
            return Err(SttError::SessionExpired);
        }
        self.ws.send(Message::Binary(request.audio_content.clone()))?;
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<RecognizeResponse>, SttError> {
        let mut responses = std::mem::take(&mut self.pending);
        let ended = self.drain(&mut responses)?;
        // Ended before the audio did: the server gave up on this stream
        if ended && responses.is_empty() {
            return Err(SttError::SessionExpired);
        }
        Ok(responses)
    }

    fn finish(&mut self) -> Result<Vec<RecognizeResponse>, SttError> {
        let mut responses = std::mem::take(&mut self.pending);
        if self.closed {
            return Ok(responses);
        }
        log::info!("📡 Sending end-of-audio marker");
        self.send_text(&json!({"audioEnd": true}))?;
        self.set_read_timeout(None)?;

        loop {
            match self.read() {
                Ok(Incoming::Response(response)) => responses.push(response),
                Ok(Incoming::Nothing) => continue,
                Ok(Incoming::Closed) => break,
                Err(SttError::SessionExpired) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(responses)
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.ws.close(None);
        }
        // Also sends any queued reply to the server's close frame
        let _ = self.ws.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_frame_shape() {
        let frame = config_frame(&StreamingConfig::linear16(16000, "ja-JP"));
        assert_eq!(
            frame,
            json!({
                "streamingConfig": {
                    "config": {
                        "encoding": "LINEAR16",
                        "sampleRateHertz": 16000,
                        "languageCode": "ja-JP"
                    },
                    "interimResults": true
                }
            })
        );
    }

    #[test]
    fn test_parse_frame_results() {
        let response = parse_frame(
            r#"{"results":[{"alternatives":[{"transcript":"hello"}],"isFinal":true}]}"#,
        )
        .unwrap();
        assert_eq!(response.final_transcript(), Some("hello"));
    }

    #[test]
    fn test_out_of_range_maps_to_session_expired() {
        let by_code = parse_frame(
            r#"{"error":{"code":11,"message":"Exceeded maximum allowed stream duration"}}"#,
        );
        assert!(matches!(by_code, Err(SttError::SessionExpired)));

        let by_status = parse_frame(r#"{"error":{"status":"OUT_OF_RANGE"}}"#);
        assert!(matches!(by_status, Err(SttError::SessionExpired)));
    }

    #[test]
    fn test_other_errors_are_remote() {
        let err = parse_frame(r#"{"error":{"code":3,"message":"bad encoding"}}"#).unwrap_err();
        assert!(matches!(
            err,
            SttError::Remote { code: 3, ref message } if message == "bad encoding"
        ));
    }

    #[test]
    fn test_endpoint_carries_api_key() {
        let service =
            WsRecognitionService::new("wss://speech.example.com/v1/stream").with_api_key("abc");
        let url = service.endpoint().unwrap();
        assert_eq!(url.as_str(), "wss://speech.example.com/v1/stream?key=abc");
    }

    #[test]
    fn test_from_config_requires_stream_url() {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        assert!(matches!(
            WsRecognitionService::from_config(&config),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }
}
