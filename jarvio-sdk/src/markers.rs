//! Marker extraction from assistant replies
//!
//! The assistant signals state transitions by embedding fixed text tokens in
//! its free-text replies. The engine regex-scans for those tokens instead of
//! requiring structured model output, so the confirmation heuristics below
//! are deliberately coarse: false positives are expected and tolerated.

use regex::Regex;

/// Marker asserting the current subtask is finished
pub const SUBTASK_COMPLETE: &str = "SUBTASK COMPLETE";
/// Marker requesting explicit human sign-off; the rest of the line describes the request
pub const APPROVAL_NEEDED: &str = "APPROVAL NEEDED:";
/// Marker opening a block of simulated collected results
pub const COLLECTED_DATA: &str = "COLLECTED DATA:";
/// Marker opening a block recording a manual step the user performed
pub const USER_WORK_LOG: &str = "USER WORK LOG:";

/// Keywords that mark an assistant message as waiting on a user reply
const CONFIRMATION_PROMPTS: [&str; 6] = [
    "please confirm",
    "confirm",
    "let me know",
    "did you",
    "tell me",
    "waiting",
];

/// Prefixes that mark a user message as a confirmation
const CONFIRMATION_PREFIXES: [&str; 8] = [
    "confirmed",
    "done",
    "yes",
    "ok",
    "approved",
    "i did",
    "finished",
    "accepted",
];

/// Flags and payloads extracted from one assistant reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyMarkers {
    pub subtask_complete: bool,
    pub approval_needed: bool,
    /// Remainder of the approval marker line, when non-empty
    pub approval_request: Option<String>,
    /// Verbatim simulated-results block; rendered, never parsed further
    pub collected_data: Option<String>,
    /// Verbatim work-log block
    pub work_log: Option<String>,
}

/// Scan a raw assistant reply for control markers
pub fn parse_assistant_reply(reply: &str) -> ReplyMarkers {
    ReplyMarkers {
        subtask_complete: reply.contains(SUBTASK_COMPLETE),
        approval_needed: reply.contains(APPROVAL_NEEDED),
        approval_request: line_after(reply, APPROVAL_NEEDED),
        collected_data: block_after(reply, COLLECTED_DATA),
        work_log: block_after(reply, USER_WORK_LOG),
    }
}

/// Heuristic scan of the last assistant message: does it leave the
/// conversation waiting on the user?
pub fn awaiting_confirmation(last_assistant_text: &str) -> bool {
    let lowered = last_assistant_text.to_lowercase();
    CONFIRMATION_PROMPTS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Whether a user message reads as a confirmation: case-insensitive prefix
/// match against a fixed set, or exactly "y"
pub fn is_user_confirmation(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered == "y"
        || CONFIRMATION_PREFIXES
            .iter()
            .any(|prefix| lowered.starts_with(prefix))
}

/// Capture the rest of the marker's line, trimmed; None when absent or empty
fn line_after(text: &str, marker: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{}[ \t]*([^\n]*)", regex::escape(marker))).unwrap();
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|request| !request.is_empty())
}

/// Capture the first block after a marker: skip whitespace, then everything
/// up to the next non-indented line (or end of text)
fn block_after(text: &str, marker: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"(?s){}\s*(.*?)(?:\n\S|\z)",
        regex::escape(marker)
    ))
    .unwrap();
    re.captures(text)
        .map(|caps| caps[1].trim_end().to_string())
        .filter(|block| !block.is_empty())
}
