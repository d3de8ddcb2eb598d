//! OpenAI chat-completions client
//!
//! `CompletionClient` is the seam between the endpoints and the provider;
//! tests script it instead of talking to the network. Calls carry no timeout
//! and are never retried: a hung upstream leaves the caller waiting, and a
//! failed call surfaces as an error for the route boundary to report.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::Config;

/// One message in a chat-completion request
#[derive(Debug, Clone)]
pub struct CompletionMessage {
    pub role: &'static str,
    pub content: String,
}

impl CompletionMessage {
    pub fn system(content: String) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            role: "assistant",
            content,
        }
    }
}

/// Chat-completion provider seam
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion over `messages` and return the raw reply text
    async fn complete(&self, messages: &[CompletionMessage]) -> Result<String>;
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[CompletionMessage]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "messages": messages
                .iter()
                .map(|m| json!({ "role": m.role, "content": m.content }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion returned {}: {}", status, body));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("chat completion returned malformed JSON")?;

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| anyhow!("chat completion reply missing message content"))?;

        Ok(content.trim().to_string())
    }
}
