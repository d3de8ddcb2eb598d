//! Server side of the assistant: system-prompt injection, one completion
//! call, marker scan

use anyhow::{Context, Result};
use std::sync::Arc;

use jarvio_sdk::{
    async_trait, AssistantBackend, AssistantRequest, AssistantResponse, BackendResult,
};

use crate::llm::{CompletionClient, CompletionMessage};
use crate::prompts;
use crate::settings::SettingsScope;

/// Assistant backend that forwards turns to the chat-completions API
pub struct OpenAiAssistant {
    client: Arc<dyn CompletionClient>,
    settings: SettingsScope,
}

impl OpenAiAssistant {
    pub fn new(client: Arc<dyn CompletionClient>, settings: SettingsScope) -> Self {
        Self { client, settings }
    }

    async fn complete_reply(&self, request: &AssistantRequest) -> Result<String> {
        let mut messages = vec![CompletionMessage::system(prompts::assistant_system_prompt(
            request,
        ))];
        for turn in &request.conversation_history {
            if turn.is_user {
                messages.push(CompletionMessage::user(turn.text.clone()));
            } else {
                messages.push(CompletionMessage::assistant(turn.text.clone()));
            }
        }
        messages.push(CompletionMessage::user(request.message.clone()));

        let reply = self
            .client
            .complete(&messages)
            .await
            .context("assistant completion failed")?;

        self.settings.increment("assistant_turns").await;
        Ok(reply)
    }
}

#[async_trait]
impl AssistantBackend for OpenAiAssistant {
    async fn respond(&self, request: AssistantRequest) -> BackendResult<AssistantResponse> {
        let reply = self.complete_reply(&request).await?;
        Ok(AssistantResponse::from_reply(reply))
    }
}
