//! Generative text backend.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    config::{Config, Credentials, ModelSettings},
    error::HttpError,
};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Single-turn completion: one instruction in, one text blob out.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn complete(&self, instruction: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

pub struct AnthropicBackend {
    http: Client,
    base_url: String,
    api_key: String,
    model: ModelSettings,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AnthropicBackend {
    pub fn new(http: Client, api_key: impl Into<String>, model: ModelSettings) -> Self {
        Self {
            http,
            base_url: ANTHROPIC_MESSAGES_URL.to_string(),
            api_key: api_key.into(),
            model,
        }
    }

    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http.timeout())
            .build()
            .context("Failed to build HTTP client for the generative backend")?;

        Ok(Self::new(http, credentials.anthropic_api_key.clone(), config.model.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl GenerativeBackend for AnthropicBackend {
    #[tracing::instrument(skip(self, instruction), fields(model = %self.model.name, prompt_chars = instruction.len()))]
    async fn complete(&self, instruction: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model.name,
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
            messages: [Message {
                role: "user",
                content: instruction,
            }],
        };

        let res = self
            .http
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to the generative backend")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read generative backend response body")?;

        if !status.is_success() {
            return Err(HttpError::new("Anthropic", status, &body).into());
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body).context("Failed to parse generative backend JSON")?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        if text.trim().is_empty() {
            return Err(anyhow!("Generative backend returned no text"));
        }

        Ok(text)
    }
}
