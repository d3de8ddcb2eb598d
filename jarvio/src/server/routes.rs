//! Request handlers for the dashboard API
//!
//! `dispatch` maps a method and path onto a handler and always produces a
//! JSON reply, so the whole surface is testable without opening a socket.
//! Task writes go through the store's version check; a lost race maps to
//! 409 instead of a plain server error.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use jarvio_sdk::{
    log_error, AssistantBackend, AssistantRequest, FlowDraft, GenerateRequest, Subtask, Task,
    WorkLogEntry,
};

use crate::flowgen::FlowGenerator;
use crate::proxy::OpenAiAssistant;
use crate::store::{Database, VersionConflict};

const DEFAULT_PAGE_SIZE: usize = 50;

/// Status and JSON body for one handled request
#[derive(Debug, Clone)]
pub struct HandlerReply {
    pub status: u16,
    pub body: String,
}

impl HandlerReply {
    fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, format!("failed to encode response: {}", e)),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }).to_string(),
        }
    }
}

/// Body of `POST /api/tasks`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    subtasks: Vec<CreateSubtask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubtask {
    title: String,
    #[serde(default)]
    description: String,
}

/// Body of `POST /api/tasks/{id}/worklog`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendWorkLogRequest {
    subtask_index: usize,
    entry: String,
}

/// All dashboard endpoints behind one dispatcher
pub struct JarvioRoutes {
    assistant: OpenAiAssistant,
    generator: FlowGenerator,
    store: Database,
}

impl JarvioRoutes {
    pub fn new(assistant: OpenAiAssistant, generator: FlowGenerator, store: Database) -> Self {
        Self {
            assistant,
            generator,
            store,
        }
    }

    /// Route one request to its handler
    pub async fn dispatch(&self, method: &str, url: &str, body: &str) -> HandlerReply {
        let path = url.split('?').next().unwrap_or(url);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            ("POST", ["api", "jarvio-assistant"]) => self.assistant_reply(body).await,
            ("POST", ["api", "generate-flow"]) => self.generate(body).await,
            ("GET", ["api", "tasks"]) => self.list_tasks(url),
            ("POST", ["api", "tasks"]) => self.create_task(body),
            ("GET", ["api", "tasks", id]) => self.get_task(id),
            ("PUT", ["api", "tasks", id]) => self.update_task(id, body),
            ("DELETE", ["api", "tasks", id]) => self.delete_task(id),
            ("GET", ["api", "tasks", id, "worklog"]) => self.get_work_log(id),
            ("POST", ["api", "tasks", id, "worklog"]) => self.append_work_log(id, body),
            ("GET", ["api", "flows"]) => self.list_flows(),
            ("POST", ["api", "flows"]) => self.create_flow(body),
            ("POST", ["api", "flows", id, "tasks"]) => self.instantiate_flow(id),
            ("GET", ["api", "stats"]) => self.stats(),
            (_, ["api", "jarvio-assistant" | "generate-flow"])
            | (_, ["api", "tasks" | "flows" | "stats"])
            | (_, ["api", "tasks", _])
            | (_, ["api", "tasks", _, "worklog"])
            | (_, ["api", "flows", _, "tasks"]) => HandlerReply::error(405, "method not allowed"),
            _ => HandlerReply::error(404, "not found"),
        }
    }

    async fn assistant_reply(&self, body: &str) -> HandlerReply {
        let request: AssistantRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => return HandlerReply::error(400, format!("invalid request body: {}", e)),
        };

        match self.assistant.respond(request).await {
            Ok(response) => HandlerReply::json(200, &response),
            Err(e) => {
                log_error!("Assistant proxy failed: {}", e);
                HandlerReply::error(500, e.to_string())
            }
        }
    }

    async fn generate(&self, body: &str) -> HandlerReply {
        let request: GenerateRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => return HandlerReply::error(400, format!("invalid request body: {}", e)),
        };

        match self.generator.generate(&request).await {
            Ok(value) => HandlerReply::ok(value),
            Err(e) => {
                log_error!("Generation failed: {}", e);
                HandlerReply::error(500, e.to_string())
            }
        }
    }

    fn list_tasks(&self, url: &str) -> HandlerReply {
        let limit = query_param(url, "limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = query_param(url, "offset")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        match self.store.list_tasks(limit, offset) {
            Ok(tasks) => HandlerReply::json(200, &tasks),
            Err(e) => store_error("Failed to list tasks", e),
        }
    }

    fn create_task(&self, body: &str) -> HandlerReply {
        let request: CreateTaskRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => return HandlerReply::error(400, format!("invalid request body: {}", e)),
        };
        if request.title.trim().is_empty() {
            return HandlerReply::error(400, "task title is empty");
        }

        let mut task = Task::new(request.title, request.description);
        task.subtasks = request
            .subtasks
            .into_iter()
            .map(|s| Subtask::new(s.title, s.description))
            .collect();

        match self.store.save_task(&mut task) {
            Ok(_) => HandlerReply::json(200, &task),
            Err(e) => store_error("Failed to save task", e),
        }
    }

    fn get_task(&self, raw_id: &str) -> HandlerReply {
        let id = match parse_uuid(raw_id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };

        match self.store.get_task(&id) {
            Ok(Some(task)) => HandlerReply::json(200, &task),
            Ok(None) => HandlerReply::error(404, format!("task {} not found", id)),
            Err(e) => store_error("Failed to load task", e),
        }
    }

    fn update_task(&self, raw_id: &str, body: &str) -> HandlerReply {
        let id = match parse_uuid(raw_id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };
        let mut task: Task = match serde_json::from_str(body) {
            Ok(task) => task,
            Err(e) => return HandlerReply::error(400, format!("invalid request body: {}", e)),
        };
        if task.id != id {
            return HandlerReply::error(400, "task id in body does not match path");
        }

        match self.store.save_task(&mut task) {
            Ok(_) => HandlerReply::json(200, &task),
            Err(e) => store_error("Failed to save task", e),
        }
    }

    fn delete_task(&self, raw_id: &str) -> HandlerReply {
        let id = match parse_uuid(raw_id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };

        match self.store.delete_task(&id) {
            Ok(true) => HandlerReply::ok(json!({ "deleted": true })),
            Ok(false) => HandlerReply::error(404, format!("task {} not found", id)),
            Err(e) => store_error("Failed to delete task", e),
        }
    }

    fn get_work_log(&self, raw_id: &str) -> HandlerReply {
        let id = match parse_uuid(raw_id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };
        if let Some(reply) = self.require_task(&id) {
            return reply;
        }

        match self.store.get_work_logs(&id) {
            Ok(entries) => HandlerReply::json(200, &entries),
            Err(e) => store_error("Failed to load work log", e),
        }
    }

    fn append_work_log(&self, raw_id: &str, body: &str) -> HandlerReply {
        let id = match parse_uuid(raw_id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };
        let request: AppendWorkLogRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => return HandlerReply::error(400, format!("invalid request body: {}", e)),
        };
        if request.entry.trim().is_empty() {
            return HandlerReply::error(400, "work log entry is empty");
        }
        if let Some(reply) = self.require_task(&id) {
            return reply;
        }

        let entry = WorkLogEntry::new(request.subtask_index, request.entry);
        match self.store.append_work_log(&id, &entry) {
            Ok(_) => HandlerReply::json(200, &entry),
            Err(e) => store_error("Failed to append work log", e),
        }
    }

    fn list_flows(&self) -> HandlerReply {
        match self.store.list_flows() {
            Ok(flows) => HandlerReply::json(200, &flows),
            Err(e) => store_error("Failed to list flows", e),
        }
    }

    fn create_flow(&self, body: &str) -> HandlerReply {
        let draft: FlowDraft = match serde_json::from_str(body) {
            Ok(draft) => draft,
            Err(e) => return HandlerReply::error(400, format!("invalid request body: {}", e)),
        };
        if let Err(e) = draft.validate() {
            return HandlerReply::error(400, e.to_string());
        }

        let flow = draft.into_flow();
        match self.store.save_flow(&flow) {
            Ok(()) => HandlerReply::json(200, &flow),
            Err(e) => store_error("Failed to save flow", e),
        }
    }

    fn instantiate_flow(&self, raw_id: &str) -> HandlerReply {
        let id = match parse_uuid(raw_id) {
            Ok(id) => id,
            Err(reply) => return reply,
        };
        let flow = match self.store.get_flow(&id) {
            Ok(Some(flow)) => flow,
            Ok(None) => return HandlerReply::error(404, format!("flow {} not found", id)),
            Err(e) => return store_error("Failed to load flow", e),
        };

        let mut task = flow.into_task();
        match self.store.save_task(&mut task) {
            Ok(_) => HandlerReply::json(200, &task),
            Err(e) => store_error("Failed to save task", e),
        }
    }

    fn stats(&self) -> HandlerReply {
        match self.store.task_stats() {
            Ok(stats) => HandlerReply::json(200, &stats),
            Err(e) => store_error("Failed to compute stats", e),
        }
    }

    fn require_task(&self, id: &Uuid) -> Option<HandlerReply> {
        match self.store.get_task(id) {
            Ok(Some(_)) => None,
            Ok(None) => Some(HandlerReply::error(404, format!("task {} not found", id))),
            Err(e) => Some(store_error("Failed to load task", e)),
        }
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, HandlerReply> {
    Uuid::parse_str(raw).map_err(|_| HandlerReply::error(400, format!("invalid id: {}", raw)))
}

fn store_error(context: &str, error: anyhow::Error) -> HandlerReply {
    if let Some(conflict) = error.downcast_ref::<VersionConflict>() {
        return HandlerReply::error(409, conflict.to_string());
    }
    log_error!("{}: {}", context, error);
    HandlerReply::error(500, error.to_string())
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split('?').nth(1)?;
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}
