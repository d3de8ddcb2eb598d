//! Flow generation: one completion per request, lenient JSON extraction,
//! allow-list sanitization, and a deterministic fallback when the model
//! output is unusable
//!
//! Provider failures (network, missing API key) propagate as errors; a reply
//! that arrives but cannot be turned into a valid draft never does.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use jarvio_sdk::{
    log_warning, BlockKind, FlowBlock, FlowDraft, GenerateKind, GenerateRequest, GENERATOR_KINDS,
};

use crate::llm::{CompletionClient, CompletionMessage};
use crate::prompts;
use crate::settings::SettingsScope;

/// Backs `POST /api/generate-flow` for both request kinds
pub struct FlowGenerator {
    client: Arc<dyn CompletionClient>,
    settings: SettingsScope,
}

impl FlowGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, settings: SettingsScope) -> Self {
        Self { client, settings }
    }

    /// Handle one generation request; `Err` only for provider failures
    pub async fn generate(&self, request: &GenerateRequest) -> Result<serde_json::Value> {
        match request.kind {
            GenerateKind::Flow => {
                let draft = self.generate_flow(&request.prompt, &request.message).await?;
                Ok(serde_json::to_value(&draft)?)
            }
            GenerateKind::Parameters => {
                self.generate_parameters(&request.prompt, &request.message)
                    .await
            }
        }
    }

    /// Produce a flow draft for `prompt`, falling back to a canned draft when
    /// the completion cannot be parsed and sanitized into a valid one
    pub async fn generate_flow(&self, prompt: &str, message: &str) -> Result<FlowDraft> {
        self.settings.increment("flow_generations").await;

        let messages = [
            CompletionMessage::system(prompts::flow_system_prompt()),
            CompletionMessage::user(prompts::generation_user_message(prompt, message)),
        ];
        let completion = self
            .client
            .complete(&messages)
            .await
            .context("flow generation failed")?;

        match draft_from_completion(&completion, prompt) {
            Some(draft) => Ok(draft),
            None => {
                self.settings.increment("flow_fallbacks").await;
                log_warning!("Flow completion was unusable, returning the fallback flow");
                Ok(fallback_flow(prompt))
            }
        }
    }

    /// Produce a raw parameter object for one block; unusable completions
    /// degrade to an empty object
    pub async fn generate_parameters(
        &self,
        prompt: &str,
        message: &str,
    ) -> Result<serde_json::Value> {
        self.settings.increment("parameter_generations").await;

        let messages = [
            CompletionMessage::system(prompts::parameters_system_prompt()),
            CompletionMessage::user(prompts::generation_user_message(prompt, message)),
        ];
        let completion = self
            .client
            .complete(&messages)
            .await
            .context("parameter generation failed")?;

        let parameters = extract_json(&completion)
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
            .filter(|value| value.is_object())
            .unwrap_or_else(|| json!({}));
        Ok(parameters)
    }
}

/// Draft shape as the model tends to emit it: every field optional, block
/// kinds as free text
#[derive(Deserialize)]
struct RawDraft {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    option: String,
    #[serde(default)]
    name: String,
}

/// Parse and sanitize a completion into a valid draft; `None` means fall back
fn draft_from_completion(completion: &str, prompt: &str) -> Option<FlowDraft> {
    let text = extract_json(completion)?;
    let raw: RawDraft = serde_json::from_str(&text).ok()?;

    let blocks: Vec<FlowBlock> = raw.blocks.iter().filter_map(sanitize_block).collect();
    if blocks.is_empty() {
        return None;
    }

    let name = match raw.name.trim() {
        "" => fallback_name(prompt),
        name => name.to_string(),
    };
    let description = match raw.description.trim() {
        "" => format!("Flow generated from: {}", prompt.trim()),
        description => description.to_string(),
    };

    Some(FlowDraft {
        name,
        description,
        blocks,
    })
}

/// Coerce one raw block onto the allow-list
///
/// Unknown kinds drop the block; a known kind with an unlisted option is
/// kept and coerced to the kind's first option.
fn sanitize_block(raw: &RawBlock) -> Option<FlowBlock> {
    let wanted = raw.kind.trim().to_lowercase();
    let kind = GENERATOR_KINDS
        .iter()
        .copied()
        .find(|kind| kind.to_string() == wanted)?;

    let option = if kind.allows(raw.option.trim()) {
        raw.option.trim().to_string()
    } else {
        kind.default_option()?.to_string()
    };

    let name = match raw.name.trim() {
        "" => option.clone(),
        name => name.to_string(),
    };

    Some(FlowBlock::new(kind, option, name))
}

/// Pull a JSON object out of a completion: fenced ```json block first, then
/// any fenced block, then the outermost brace pair
fn extract_json(completion: &str) -> Option<String> {
    if let Some(start) = completion.find("```json") {
        let after = &completion[start + 7..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim().to_string());
        }
    }
    if let Some(start) = completion.find("```") {
        let after = &completion[start + 3..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim().to_string());
        }
    }
    let re = Regex::new(r"\{[\s\S]*\}").unwrap();
    re.find(completion).map(|m| m.as_str().to_string())
}

/// Short flow name derived from the prompt
fn fallback_name(prompt: &str) -> String {
    let short: String = prompt.trim().chars().take(60).collect();
    let mut chars = short.chars();
    match chars.next() {
        None => "New Flow".to_string(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Deterministic draft used whenever generation cannot produce a usable one
pub fn fallback_flow(prompt: &str) -> FlowDraft {
    FlowDraft {
        name: fallback_name(prompt),
        description: format!("Flow generated from: {}", prompt.trim()),
        blocks: vec![
            FlowBlock::new(
                BlockKind::Collect,
                "User Text".to_string(),
                "Describe what you need".to_string(),
            ),
            FlowBlock::new(
                BlockKind::Think,
                "Basic AI Analysis".to_string(),
                "Analyze the request".to_string(),
            ),
            FlowBlock::new(
                BlockKind::Act,
                "AI Summary".to_string(),
                "Summarize next steps".to_string(),
            ),
        ],
    }
}
