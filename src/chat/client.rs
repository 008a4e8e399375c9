use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ChatConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A chat-completion backend: messages in, assistant reply out.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    /// `None` when no API key is configured.
    pub fn from_config(cfg: &ChatConfig) -> Option<Self> {
        let api_key = cfg.api_key.clone()?;
        Some(Self {
            client: Client::builder()
                .user_agent("backoffice/0.1")
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url: cfg.api_url.clone(),
            api_key,
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        debug!(model = %self.model, messages = messages.len(), "chat completion request");
        let response: CompletionResponse = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .context("send chat completion")?
            .error_for_status()
            .context("chat completion status")?
            .json()
            .await
            .context("decode chat completion")?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("chat completion had no choices")
    }
}
