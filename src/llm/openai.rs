//! OpenAI chat-completions client for description parsing

use crate::config::LlmConfig;
use crate::llm::schema::{parse_enrichment, Enrichment};
use crate::llm::{DescriptionParser, EnrichmentError};
use crate::{ConfigError, SourcetapError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Sends each description to a chat model with a fixed system prompt
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Set a custom base URL (proxies, compatible servers, tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds a client from the `[llm]` table
    ///
    /// The API key comes from the environment variable the table names and
    /// the system prompt from `prompt-path`; both are required.
    pub fn from_config(config: &LlmConfig) -> Result<Self, SourcetapError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(config.api_key_env.clone()))?;

        let system_prompt = load_prompt(Path::new(&config.prompt_path))?;

        Ok(Self::new(api_key, config.model.clone(), system_prompt).with_base_url(&config.base_url))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a chat completion and returns the first choice's content
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<String, EnrichmentError> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Malformed(format!("unreadable API response: {}", e)))?;

        tracing::debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );

        raw.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(EnrichmentError::EmptyResponse)
    }
}

#[async_trait]
impl DescriptionParser for OpenAiClient {
    async fn parse_description(&self, description: &str) -> Result<Enrichment, EnrichmentError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(self.system_prompt.clone()),
                Message::user(format!("Job description: {}", description)),
            ],
            temperature: Some(0.0),
        };

        let content = self.chat_completion(&request).await?;
        parse_enrichment(&content)
    }
}

/// Reads the system prompt file
pub fn load_prompt(path: &Path) -> Result<String, EnrichmentError> {
    let prompt = std::fs::read_to_string(path).map_err(|source| EnrichmentError::Prompt {
        path: path.display().to_string(),
        source,
    })?;
    if prompt.trim().is_empty() {
        return Err(EnrichmentError::Malformed(format!(
            "prompt file {} is empty",
            path.display()
        )));
    }
    Ok(prompt)
}
