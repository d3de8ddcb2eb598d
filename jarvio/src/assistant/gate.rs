//! Session input gating and auto-run state
//!
//! One tagged gate per session says what the input control may do right now;
//! every transition sets it explicitly, so there is exactly one source of
//! truth for "is the input enabled".

/// What the chat input currently accepts
#[derive(Debug, Clone, PartialEq)]
pub enum InputGate {
    /// Free input
    Ready,
    /// A backend call is in flight
    AwaitingReply,
    /// Last reply asked the user to confirm a manual step; free input stays
    /// open so the confirmation can be typed
    AwaitingConfirmation,
    /// Approve/Reject are the only actions until one is taken
    PendingApproval { request: String },
    /// A subtask just completed in manual mode; feedback or continue
    FeedbackPrompt { subtask_index: usize },
}

impl Default for InputGate {
    fn default() -> Self {
        InputGate::Ready
    }
}

impl InputGate {
    /// Whether free-text input is accepted
    pub fn accepts_input(&self) -> bool {
        matches!(self, InputGate::Ready | InputGate::AwaitingConfirmation)
    }

    pub fn is_pending_approval(&self) -> bool {
        matches!(self, InputGate::PendingApproval { .. })
    }
}

/// Auto-run mode and its pause flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoRun {
    pub mode: bool,
    pub paused: bool,
}

impl AutoRun {
    /// Whether completions advance without a user click
    pub fn is_active(&self) -> bool {
        self.mode && !self.paused
    }

    pub fn start(&mut self) {
        self.mode = true;
        self.paused = false;
    }

    /// Pausing keeps the mode on; a later resume picks up where it left off
    pub fn pause(&mut self) {
        if self.mode {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.mode {
            self.paused = false;
        }
    }

    pub fn stop(&mut self) {
        self.mode = false;
        self.paused = false;
    }
}
