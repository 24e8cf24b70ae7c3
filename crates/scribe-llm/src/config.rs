//! Service configuration loaded from the environment.

use std::time::Duration;

use scribe_core::models::DEFAULT_MIN_SCORE;
use thiserror::Error;

use crate::chat::OpenAiChatConfig;
use crate::presidio::PresidioConfig;
use crate::transcription::WhisperConfig;

pub const DEFAULT_ANALYZER_URL: &str = "http://presidio-analyzer:5002";
pub const DEFAULT_ANONYMIZER_URL: &str = "http://presidio-anonymizer:5001";
pub const DEFAULT_PRESIDIO_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_WHISPER_URL: &str = "http://localhost:8000/v1/audio/transcriptions";
pub const DEFAULT_WHISPER_MODEL: &str = "large-v3";
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 60_000;

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} is out of range: {value}")]
    OutOfRange { key: &'static str, value: String },

    #[error("{0} is required when LLM_ENDPOINT is set")]
    Missing(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ScribeConfig {
    pub presidio: PresidioConfig,
    pub whisper: WhisperConfig,
    /// Chat model; absent when `LLM_ENDPOINT` is unset
    pub llm: Option<OpenAiChatConfig>,
}

impl ScribeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let min_score = match var("PRESIDIO_MIN_SCORE") {
            Some(raw) => {
                let score: f64 = parse_number("PRESIDIO_MIN_SCORE", &raw)?;
                if !(0.0..=1.0).contains(&score) {
                    return Err(ConfigError::OutOfRange {
                        key: "PRESIDIO_MIN_SCORE",
                        value: raw,
                    });
                }
                score
            }
            None => DEFAULT_MIN_SCORE,
        };

        let presidio = PresidioConfig {
            analyzer_url: var("PRESIDIO_ANALYZER_URL").unwrap_or_else(|| DEFAULT_ANALYZER_URL.to_string()),
            anonymizer_url: var("PRESIDIO_ANONYMIZER_URL")
                .unwrap_or_else(|| DEFAULT_ANONYMIZER_URL.to_string()),
            min_score,
            timeout: millis(&var, "PRESIDIO_TIMEOUT_MS", DEFAULT_PRESIDIO_TIMEOUT_MS)?,
        };

        let whisper = WhisperConfig {
            url: var("WHISPER_URL").unwrap_or_else(|| DEFAULT_WHISPER_URL.to_string()),
            model: var("WHISPER_MODEL_SIZE").unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string()),
            api_key: var("WHISPER_API_KEY"),
        };

        let llm = match var("LLM_ENDPOINT") {
            Some(endpoint) => Some(OpenAiChatConfig {
                endpoint,
                api_key: var("LLM_API_KEY").unwrap_or_default(),
                model: var("LLM_MODEL").ok_or(ConfigError::Missing("LLM_MODEL"))?,
                timeout: millis(&var, "LLM_TIMEOUT_MS", DEFAULT_LLM_TIMEOUT_MS)?,
            }),
            None => None,
        };

        Ok(Self {
            presidio,
            whisper,
            llm,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })
}

fn millis<F>(var: &F, key: &'static str, default: u64) -> ConfigResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let ms = match var(key) {
        Some(raw) => parse_number(key, &raw)?,
        None => default,
    };
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<ScribeConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScribeConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.presidio.analyzer_url, DEFAULT_ANALYZER_URL);
        assert_eq!(config.presidio.anonymizer_url, DEFAULT_ANONYMIZER_URL);
        assert_eq!(config.presidio.min_score, 0.7);
        assert_eq!(config.presidio.timeout, Duration::from_millis(5000));
        assert_eq!(config.whisper.url, DEFAULT_WHISPER_URL);
        assert_eq!(config.whisper.model, "large-v3");
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PRESIDIO_ANALYZER_URL", "http://localhost:5002"),
            ("PRESIDIO_MIN_SCORE", "0.85"),
            ("PRESIDIO_TIMEOUT_MS", "250"),
            ("WHISPER_MODEL_SIZE", "medium"),
            ("LLM_ENDPOINT", "http://localhost:11434/v1/chat/completions"),
            ("LLM_MODEL", "llama3.1"),
            ("LLM_TIMEOUT_MS", "1500"),
        ])
        .unwrap();

        assert_eq!(config.presidio.analyzer_url, "http://localhost:5002");
        assert_eq!(config.presidio.min_score, 0.85);
        assert_eq!(config.presidio.timeout, Duration::from_millis(250));
        assert_eq!(config.whisper.model, "medium");

        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "llama3.1");
        assert_eq!(llm.api_key, "");
        assert_eq!(llm.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("PRESIDIO_TIMEOUT_MS", "  "), ("LLM_ENDPOINT", "")]).unwrap();
        assert_eq!(config.presidio.timeout, Duration::from_millis(5000));
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_invalid_numbers() {
        let err = load(&[("PRESIDIO_TIMEOUT_MS", "five seconds")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "PRESIDIO_TIMEOUT_MS",
                value: "five seconds".into()
            }
        );

        let err = load(&[("PRESIDIO_MIN_SCORE", "high")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: "PRESIDIO_MIN_SCORE", .. }));

        let err = load(&[("PRESIDIO_MIN_SCORE", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_llm_model_required() {
        let err = load(&[("LLM_ENDPOINT", "http://localhost:8080/v1/chat/completions")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("LLM_MODEL"));
    }
}
