//! Wire protocol between the engine and the assistant backend
//!
//! Field names follow the JSON shape of the dashboard endpoints
//! (camelCase). `AssistantBackend` is the seam the engine drives: the HTTP
//! client implements it on one side of the wire, the OpenAI proxy on the
//! other, and tests script it directly.

use serde::{Deserialize, Serialize};

// Re-export async trait for convenience
pub use async_trait::async_trait;

use crate::markers;
use crate::message::ChatMessage;
use crate::task::Subtask;

/// Task metadata sent along with every assistant turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub title: String,
    pub description: String,
    pub category: String,
}

/// Body of `POST /api/jarvio-assistant`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: String,
    pub task_context: TaskContext,
    pub subtasks: Vec<Subtask>,
    pub current_subtask_index: usize,
    pub conversation_history: Vec<ChatMessage>,
}

/// Successful reply from the assistant endpoint: the raw text plus the
/// marker flags derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub reply: String,
    pub subtask_complete: bool,
    pub approval_needed: bool,
    pub collected_data: Option<String>,
    pub user_work_log: Option<String>,
}

impl AssistantResponse {
    /// Build a response from a raw reply by scanning it for markers
    pub fn from_reply(reply: String) -> Self {
        let found = markers::parse_assistant_reply(&reply);
        Self {
            reply,
            subtask_complete: found.subtask_complete,
            approval_needed: found.approval_needed,
            collected_data: found.collected_data,
            user_work_log: found.work_log,
        }
    }
}

/// What the generation endpoint is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateKind {
    Flow,
    Parameters,
}

/// Body of `POST /api/generate-flow`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: GenerateKind,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// One turn against the assistant backend
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn respond(&self, request: AssistantRequest) -> BackendResult<AssistantResponse>;
}
