use secrecy::{ExposeSecret, SecretBox};
use std::env;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid API key format for {service}: {reason}")]
    InvalidKeyFormat { service: String, reason: String },
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Credentials for the Google speech services.
#[derive(Debug)]
pub enum GoogleAuth {
    /// Sent as the `key` query parameter.
    ApiKey(SecretBox<String>),
    /// Sent as `Authorization: Bearer ...`.
    AccessToken(SecretBox<String>),
    None,
}

impl GoogleAuth {
    pub fn api_key(&self) -> Option<&str> {
        match self {
            GoogleAuth::ApiKey(key) => Some(key.expose_secret()),
            _ => None,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            GoogleAuth::AccessToken(token) => Some(token.expose_secret()),
            _ => None,
        }
    }
}

/// Configuration for API services
#[derive(Debug)]
pub struct ApiConfig {
    openai_key: Option<SecretBox<String>>,
    pub openai_base_url: String,
    google_api_key: Option<SecretBox<String>>,
    google_access_token: Option<SecretBox<String>>,
    speech_stream_url: Option<String>,
}

impl ApiConfig {
    /// Load API configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_base_url = lookup("OPENAI_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let openai_key = match lookup("OPENAI_API_KEY") {
            Some(key) => {
                if key.trim().is_empty() {
                    return Err(ConfigError::InvalidKeyFormat {
                        service: "OpenAI".to_string(),
                        reason: "API key cannot be empty".to_string(),
                    });
                }
                if openai_base_url == DEFAULT_OPENAI_BASE_URL {
                    Self::validate_key_format(&key, "OpenAI")?;
                }
                Some(SecretBox::new(Box::new(key)))
            }
            None => None,
        };

        let speech_stream_url = match lookup("SPEECH_STREAM_URL") {
            Some(url) if !url.trim().is_empty() => {
                let url = url.trim().to_string();
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(ConfigError::InvalidValue {
                        var: "SPEECH_STREAM_URL".to_string(),
                        reason: "expected a ws:// or wss:// URL".to_string(),
                    });
                }
                Some(url)
            }
            _ => None,
        };

        Ok(Self {
            openai_key,
            openai_base_url,
            google_api_key: Self::optional_secret(&lookup, "GOOGLE_API_KEY"),
            google_access_token: Self::optional_secret(&lookup, "GOOGLE_ACCESS_TOKEN"),
            speech_stream_url,
        })
    }

    fn optional_secret<F>(lookup: &F, var: &str) -> Option<SecretBox<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(var)
            .filter(|value| !value.trim().is_empty())
            .map(|value| SecretBox::new(Box::new(value)))
    }

    /// Validate API key format for each service
    fn validate_key_format(key: &str, service: &str) -> Result<(), ConfigError> {
        match service {
            "OpenAI" => {
                // OpenAI keys start with "sk-"
                if !key.starts_with("sk-") {
                    return Err(ConfigError::InvalidKeyFormat {
                        service: service.to_string(),
                        reason: "OpenAI keys should start with 'sk-'".to_string(),
                    });
                }
            }
            _ => {} // No validation for unknown services
        }
        Ok(())
    }

    /// Get OpenAI API key (use only when making API calls)
    pub fn openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))
    }

    pub fn speech_stream_url(&self) -> Result<&str, ConfigError> {
        self.speech_stream_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("SPEECH_STREAM_URL".to_string()))
    }

    /// Google credentials. An API key wins over an access token.
    pub fn google_auth(&self) -> GoogleAuth {
        if let Some(key) = &self.google_api_key {
            return GoogleAuth::ApiKey(SecretBox::new(Box::new(key.expose_secret().clone())));
        }
        if let Some(token) = &self.google_access_token {
            return GoogleAuth::AccessToken(SecretBox::new(Box::new(
                token.expose_secret().clone(),
            )));
        }
        GoogleAuth::None
    }
}

/// Load configuration with helpful error messages for development
pub fn load_config() -> Result<ApiConfig, ConfigError> {
    match ApiConfig::load() {
        Ok(config) => {
            log::info!("Successfully loaded API configuration");
            Ok(config)
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            log::error!("Set the variable in the environment or in a .env file");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_key_validation() {
        assert!(ApiConfig::validate_key_format("sk-test123", "OpenAI").is_ok());
        assert!(ApiConfig::validate_key_format("invalid", "OpenAI").is_err());
        assert!(ApiConfig::validate_key_format("anything", "Other").is_ok());
    }

    #[test]
    fn test_defaults_with_only_openai_key() {
        let config = ApiConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-abc")])).unwrap();
        assert_eq!(config.openai_key().unwrap(), "sk-abc");
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert!(matches!(config.google_auth(), GoogleAuth::None));
        assert!(matches!(
            config.speech_stream_url(),
            Err(ConfigError::MissingEnvVar(var)) if var == "SPEECH_STREAM_URL"
        ));
    }

    #[test]
    fn test_missing_openai_key_is_reported_on_use() {
        let config = ApiConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(matches!(
            config.openai_key(),
            Err(ConfigError::MissingEnvVar(var)) if var == "OPENAI_API_KEY"
        ));
    }

    #[test]
    fn test_empty_openai_key_rejected() {
        let err = ApiConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKeyFormat { .. }));
    }

    #[test]
    fn test_custom_base_url_skips_prefix_check() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "local-key"),
            ("OPENAI_BASE_URL", "http://localhost:8000/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.openai_base_url, "http://localhost:8000/v1");
        assert_eq!(config.openai_key().unwrap(), "local-key");

        let err = ApiConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "local-key")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKeyFormat { .. }));
    }

    #[test]
    fn test_google_api_key_wins_over_token() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "AIza-key"),
            ("GOOGLE_ACCESS_TOKEN", "ya29.token"),
        ]))
        .unwrap();
        assert_eq!(config.google_auth().api_key(), Some("AIza-key"));

        let config =
            ApiConfig::from_lookup(lookup_from(&[("GOOGLE_ACCESS_TOKEN", "ya29.token")])).unwrap();
        let auth = config.google_auth();
        assert_eq!(auth.bearer_token(), Some("ya29.token"));
        assert_eq!(auth.api_key(), None);
    }

    #[test]
    fn test_speech_stream_url_must_be_websocket() {
        let err = ApiConfig::from_lookup(lookup_from(&[(
            "SPEECH_STREAM_URL",
            "https://example.com/stream",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let config = ApiConfig::from_lookup(lookup_from(&[(
            "SPEECH_STREAM_URL",
            "wss://speech.example.com/v1/stream",
        )]))
        .unwrap();
        assert_eq!(
            config.speech_stream_url().unwrap(),
            "wss://speech.example.com/v1/stream"
        );
    }

    #[test]
    #[serial]
    fn test_load_reads_process_environment() {
        env::set_var("OPENAI_API_KEY", "sk-from-env");
        env::set_var("SPEECH_STREAM_URL", "ws://127.0.0.1:9000/stream");
        let config = ApiConfig::load().unwrap();
        assert_eq!(config.openai_key().unwrap(), "sk-from-env");
        assert_eq!(config.speech_stream_url().unwrap(), "ws://127.0.0.1:9000/stream");
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("SPEECH_STREAM_URL");
    }
}
