//! OpenRouter chat-completions client.
//!
//! Implements [`TextGenerator`] over any OpenAI-compatible
//! `/chat/completions` endpoint. The API key is kept in a [`SecretString`] and
//! never shows up in `Debug` output or logs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::contract::TextGenerator;
use crate::error::{BoxError, Result, ZenError};

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-haiku";

/// Settings of the generation service client.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    /// Sent as `HTTP-Referer`, used by OpenRouter for attribution.
    pub referer: String,
    /// Sent as `X-Title`.
    pub title: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout: Duration::from_millis(60_000),
            referer: "http://localhost:5000".to_string(),
            title: "ZenDocs Generator".to_string(),
        }
    }
}

pub struct OpenRouterClient {
    api_key: SecretString,
    settings: GeneratorSettings,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("api_key", &"[REDACTED]")
            .field("settings", &self.settings)
            .finish()
    }
}

impl OpenRouterClient {
    pub fn new(api_key: SecretString, settings: GeneratorSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ZenError::Unexpected(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            api_key,
            settings,
            client,
        })
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<Option<String>, BoxError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.api_base.trim_end_matches('/')
        );
        debug!(url = %url, model = %self.settings.model, "Sending generation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", &self.settings.title)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Generation service returned an error");
            return Err(format!("Request failed with status code {}", status.as_u16()).into());
        }

        let body: ChatCompletionResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_payload_matches_chat_completions_shape() {
        let client =
            OpenRouterClient::new(SecretString::from("sk-test"), GeneratorSettings::default())
                .unwrap();
        let json = serde_json::to_value(client.build_request("hello")).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["max_tokens"], 2000);
    }

    #[test]
    fn debug_output_redacts_key() {
        let client = OpenRouterClient::new(
            SecretString::from("sk-very-secret"),
            GeneratorSettings::default(),
        )
        .unwrap();
        let printed = format!("{client:?}");
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn response_without_choices_parses() {
        let body: ChatCompletionResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(body.choices.is_empty());
    }
}
