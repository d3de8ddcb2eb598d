//! Shared data model, wire protocol, marker parser, and session events for
//! the Jarvio assistant engine.

pub mod events;
pub mod flow;
pub mod markers;
pub mod message;
pub mod protocol;
pub mod task;

pub use events::{EventReceiver, SessionEvent};
pub use flow::{BlockKind, Flow, FlowBlock, FlowDraft, FlowError, FlowStep, GENERATOR_KINDS};
pub use markers::{
    awaiting_confirmation, is_user_confirmation, parse_assistant_reply, ReplyMarkers,
    APPROVAL_NEEDED, COLLECTED_DATA, SUBTASK_COMPLETE, USER_WORK_LOG,
};
pub use message::ChatMessage;
pub use protocol::{
    async_trait, AssistantBackend, AssistantRequest, AssistantResponse, BackendResult,
    GenerateKind, GenerateRequest, TaskContext,
};
pub use task::{Priority, Subtask, SubtaskStatus, Task, TaskStatus, WorkLogEntry};

// ============================================================================
// Console Logging Macros
// ============================================================================
// Human-readable console output, complementing the structured SessionEvent
// stream the engine emits for subscribers.
// ============================================================================

/// Logs an informational message.
///
/// # Example
/// ```
/// use jarvio_sdk::log_info;
/// log_info!("Listening on 127.0.0.1:8787");
/// ```
///
/// Outputs:
/// ```text
/// ℹ Listening on 127.0.0.1:8787
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use jarvio_sdk::log_warning;
/// log_warning!("Flow draft had no usable blocks, using fallback");
/// ```
///
/// Outputs:
/// ```text
/// ⚠ Warning: Flow draft had no usable blocks, using fallback
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs an error message to stderr.
///
/// # Example
/// ```
/// use jarvio_sdk::log_error;
/// log_error!("Assistant request failed: connection refused");
/// ```
///
/// Outputs:
/// ```text
/// ✗ Assistant request failed: connection refused
/// ```
#[macro_export]
macro_rules! log_error {
    ($message:expr) => {
        eprintln!("\x1b[31m✗ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        eprintln!("\x1b[31m✗ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}
