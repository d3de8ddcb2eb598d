//! Prompt builders for the assistant proxy and the flow generator
//!
//! The assistant prompt teaches the model the marker protocol the engine
//! scans for; the generation prompts pin the JSON shapes and the block
//! option allow-list.

use jarvio_sdk::{AssistantRequest, GENERATOR_KINDS};

/// System prompt for one assistant turn, carrying the task context and the
/// subtask list with the current position marked
pub fn assistant_system_prompt(request: &AssistantRequest) -> String {
    let mut subtask_lines = String::new();
    for (index, subtask) in request.subtasks.iter().enumerate() {
        let flag = if index == request.current_subtask_index {
            "current".to_string()
        } else if subtask.done {
            "done".to_string()
        } else {
            subtask.status.to_string().to_lowercase()
        };
        subtask_lines.push_str(&format!(
            "{}. [{}] {} - {}\n",
            index + 1,
            flag,
            subtask.title,
            subtask.description
        ));
    }

    format!(
        "You are Jarvio, an assistant that walks an Amazon seller through a task one subtask at a time.\n\
         \n\
         Rules:\n\
         - Work only on the current subtask; do not jump ahead.\n\
         - When a subtask needs data you cannot actually fetch, invent plausible results and present them in a block opening with `COLLECTED DATA:`, one indented line per item.\n\
         - When the current subtask is finished, include the exact text `SUBTASK COMPLETE` in your reply.\n\
         - Never pretend to perform a real-world action (emails, Amazon pushes). Ask for sign-off instead, on a single line starting with `APPROVAL NEEDED:` followed by what needs approving.\n\
         - When the seller confirms they performed a manual step themselves, record it in a block opening with `USER WORK LOG:`, one indented line per step.\n\
         - If you need anything from the seller before continuing, ask and wait.\n\
         \n\
         # Task\n\
         Title: {title}\n\
         Description: {description}\n\
         Category: {category}\n\
         \n\
         # Subtasks (current: {position} of {total})\n\
         {subtasks}",
        title = request.task_context.title,
        description = request.task_context.description,
        category = request.task_context.category,
        position = request.current_subtask_index + 1,
        total = request.subtasks.len(),
        subtasks = subtask_lines,
    )
}

/// System prompt for flow generation, enumerating the option allow-list
pub fn flow_system_prompt() -> String {
    let mut allowed = String::new();
    for kind in GENERATOR_KINDS {
        allowed.push_str(&format!(
            "- {}: {}\n",
            kind,
            kind.allowed_options().join(", ")
        ));
    }

    format!(
        "You design flows for an Amazon seller dashboard. A flow is an ordered list of blocks.\n\
         \n\
         Reply with a single JSON object and nothing else:\n\
         {{\"name\": \"...\", \"description\": \"...\", \"blocks\": [{{\"type\": \"collect\", \"option\": \"...\", \"name\": \"...\"}}]}}\n\
         \n\
         Every block's \"type\" must be collect, think, or act, and its \"option\" must come from this list:\n\
         {allowed}\n\
         Use 2 to 6 blocks. Block \"name\" is a short label for what that block does.",
        allowed = allowed,
    )
}

/// System prompt for block parameter generation
pub fn parameters_system_prompt() -> String {
    "You fill in configuration for one block of an Amazon seller flow.\n\
     \n\
     Reply with a single JSON object of parameter names to values and nothing else.\n\
     Invent sensible defaults for anything the request does not pin down."
        .to_string()
}

/// User turn for the generation endpoints: the prompt plus any extra context
pub fn generation_user_message(prompt: &str, message: &str) -> String {
    if message.trim().is_empty() {
        prompt.to_string()
    } else {
        format!("{}\n\nAdditional context: {}", prompt, message.trim())
    }
}
