//! External decision service.
//!
//! The engine only depends on the text-in/text-out [`Oracle`] trait. A client
//! is constructed explicitly and injected into the [`crate::StrategySelector`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Errors from an oracle call. Never surfaced as engine errors.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("empty response")]
    EmptyResponse,

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Text-in/text-out decision service.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Oracle that is never reachable, so every decision takes the local default.
#[derive(Debug, Clone, Default)]
pub struct OfflineOracle;

#[async_trait]
impl Oracle for OfflineOracle {
    async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
        Err(OracleError::Unavailable("offline".into()))
    }
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".into()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}

fn default_base_url() -> String {
    "https://api.anthropic.com/v1/messages".into()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Pause before retrying a rate-limited request; `None` after the last attempt.
fn rate_limit_backoff(attempt: u32, attempts: u32) -> Option<Duration> {
    (attempt + 1 < attempts).then(|| Duration::from_secs(u64::from(attempt + 1) * 2))
}

/// Settings for [`AnthropicOracle`].
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Attempts made while the API answers 429.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Oracle backed by the Anthropic Messages API.
pub struct AnthropicOracle {
    client: reqwest::Client,
    api_key: String,
    config: OracleConfig,
}

impl AnthropicOracle {
    pub fn new(api_key: impl Into<String>, config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Read the API key from the configured environment variable.
    pub fn from_env(config: OracleConfig) -> Result<Self, OracleError> {
        let key = std::env::var(&config.api_key_env).map_err(|_| {
            OracleError::Unavailable(format!("{} is not set", config.api_key_env))
        })?;
        Self::new(key, config)
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let attempts = self.config.max_retries.max(1);
        for attempt in 0..attempts {
            let resp = self
                .client
                .post(&self.config.base_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if status.as_u16() == 429 {
                match rate_limit_backoff(attempt, attempts) {
                    Some(wait) => {
                        warn!("Oracle rate limited, waiting {}s", wait.as_secs());
                        tokio::time::sleep(wait).await;
                    }
                    None => warn!("Oracle rate limited, giving up after {} attempts", attempts),
                }
                continue;
            }
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(OracleError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: MessagesResponse = resp.json().await?;
            let text: String = parsed
                .content
                .into_iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text)
                .collect::<Vec<_>>()
                .join("");
            debug!("Oracle replied ({} chars)", text.len());
            if text.trim().is_empty() {
                return Err(OracleError::EmptyResponse);
            }
            return Ok(text);
        }
        Err(OracleError::RateLimited(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_oracle_fails() {
        let err = OfflineOracle.complete("anything").await.unwrap_err();
        assert!(matches!(err, OracleError::Unavailable(_)));
    }

    #[test]
    fn test_config_defaults() {
        let config: OracleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.max_retries, 5);
        assert!(config.base_url.starts_with("https://"));
    }

    #[test]
    fn test_from_env_missing_key() {
        let config = OracleConfig {
            api_key_env: "FORMWRIGHT_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..Default::default()
        };
        assert!(matches!(
            AnthropicOracle::from_env(config),
            Err(OracleError::Unavailable(_))
        ));
    }

    #[test]
    fn test_rate_limit_backoff() {
        assert_eq!(rate_limit_backoff(0, 3), Some(Duration::from_secs(2)));
        assert_eq!(rate_limit_backoff(1, 3), Some(Duration::from_secs(4)));
        assert_eq!(rate_limit_backoff(2, 3), None);
        assert_eq!(rate_limit_backoff(0, 1), None);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"content":[{"type":"text","text":"select_by_label"}],"stop_reason":"end_turn"}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text, "select_by_label");
    }
}
