//! Structured session events
//!
//! Tagged events the engine publishes on every state transition: mirrored to
//! stderr as JSON lines and broadcast to in-process subscribers.

use serde::{Deserialize, Serialize};

/// Receiver half of a session's event broadcast
pub type EventReceiver = tokio::sync::broadcast::Receiver<SessionEvent>;

/// One state transition in an assistant session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// User turn handed to the backend
    MessageSent { text: String },
    /// Assistant reply received and applied
    ReplyReceived {
        subtask_index: usize,
        subtask_complete: bool,
        approval_needed: bool,
    },
    /// Current subtask marked done
    SubtaskCompleted { index: usize, title: String },
    /// Current subtask explicitly skipped
    SubtaskSkipped { index: usize, title: String },
    /// Assistant asked for human sign-off
    ApprovalRequested { request: String },
    /// User approved or rejected the pending request
    ApprovalResolved { approved: bool },
    /// Feedback attached before continuing
    FeedbackSubmitted { index: usize, feedback: String },
    /// Simulated results recorded against a subtask
    DataCollected { index: usize, data: String },
    /// Manual-step log recorded against a subtask
    WorkLogRecorded { index: usize, entry: String },
    /// Auto-run mode or pause flag changed
    AutoRunChanged { mode: bool, paused: bool },
    /// Every subtask resolved
    TaskCompleted { title: String },
    /// Backend call failed
    DriverFailed { error: String },
}

impl SessionEvent {
    /// Emit this event to stderr as a tagged JSON line
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("__JARVIO_EVENT__:{}", json);
            // Flush so lines stay whole under concurrent writers
            let _ = std::io::stderr().flush();
        }
    }
}
