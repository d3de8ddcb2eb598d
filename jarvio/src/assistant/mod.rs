//! Conversation-driven subtask progression
//!
//! This module holds the session engine and its two seams:
//! - **gate**: input gating and auto-run state
//! - **driver**: the HTTP `AssistantBackend` pointed at the proxy endpoint
//! - **engine**: the per-task session applying replies to task state

pub mod driver;
pub mod engine;
pub mod gate;

// Re-export commonly used types
pub use driver::HttpAssistant;
pub use engine::{AssistantSession, CollectedData, DriverOutcome};
pub use gate::{AutoRun, InputGate};
