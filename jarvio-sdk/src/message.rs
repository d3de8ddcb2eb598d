//! Conversation messages
//!
//! Messages are append-only per session and live only in memory; the
//! conversation log is not persisted.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user or assistant turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn user(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            is_user: true,
            timestamp: Local::now(),
        }
    }

    pub fn assistant(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            is_user: false,
            timestamp: Local::now(),
        }
    }
}
