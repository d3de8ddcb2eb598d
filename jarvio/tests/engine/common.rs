//! Common test utilities for the engine tests

use std::collections::VecDeque;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use jarvio::assistant::AssistantSession;
use jarvio::llm::{CompletionClient, CompletionMessage};
use jarvio_sdk::{
    async_trait, AssistantBackend, AssistantRequest, AssistantResponse, BackendResult, BlockKind,
    Flow, FlowBlock, FlowStep, Subtask, Task,
};

/// Create a temporary directory for testing
pub fn create_temp_dir(name: &str) -> PathBuf {
    let temp_dir = std::env::temp_dir().join(format!("jarvio_engine_test_{}", name));
    std::fs::create_dir_all(&temp_dir).unwrap();
    temp_dir
}

/// Clean up temporary directory
pub fn cleanup_temp_dir(path: &PathBuf) {
    if path.exists() {
        std::fs::remove_dir_all(path).ok();
    }
}

/// Create a sample task with the given number of subtasks
pub fn sample_task(subtask_count: usize) -> Task {
    let mut task = Task::new(
        "Restock best sellers".to_string(),
        "Identify and restock top performing listings".to_string(),
    );
    task.category = "Inventory".to_string();
    for i in 0..subtask_count {
        task.subtasks.push(Subtask::new(
            format!("Step {}", i + 1),
            format!("Work through step {}", i + 1),
        ));
    }
    task
}

/// Create a sample flow with blocks and steps referencing them
pub fn sample_flow() -> Flow {
    let mut flow = Flow::new(
        "Restock best sellers".to_string(),
        "Find and restock top performing listings".to_string(),
    );
    flow.blocks = vec![
        FlowBlock::new(
            BlockKind::Collect,
            "All Listing Info".to_string(),
            "Gather listings".to_string(),
        ),
        FlowBlock::new(
            BlockKind::Think,
            "Basic AI Analysis".to_string(),
            "Rank by sales".to_string(),
        ),
        FlowBlock::new(
            BlockKind::Act,
            "Push to Amazon".to_string(),
            "Submit restock".to_string(),
        ),
    ];
    flow.steps = vec![
        FlowStep {
            title: "Gather listing data".to_string(),
            description: "Pull current listings".to_string(),
            block_index: Some(0),
        },
        FlowStep {
            title: "Identify best sellers".to_string(),
            description: "Rank listings by velocity".to_string(),
            block_index: Some(1),
        },
        FlowStep {
            title: "Submit restock order".to_string(),
            description: "Push the restock to Amazon".to_string(),
            block_index: Some(2),
        },
    ];
    flow
}

/// Assistant backend fake: pops one scripted outcome per turn and records
/// every request it was handed
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<AssistantRequest>>,
}

impl ScriptedBackend {
    /// Script successful raw replies, in order
    pub fn with_replies(replies: &[&str]) -> Arc<Self> {
        Self::with_outcomes(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    /// Script a mix of replies and failures, in order
    pub fn with_outcomes(outcomes: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Snapshot of the requests received so far
    pub fn requests(&self) -> Vec<AssistantRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn respond(&self, request: AssistantRequest) -> BackendResult<AssistantResponse> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(AssistantResponse::from_reply(reply)),
            Some(Err(error)) => Err(error.into()),
            None => Err("scripted backend ran out of replies".into()),
        }
    }
}

/// Session over a sample task and a scripted backend
pub fn scripted_session(
    subtask_count: usize,
    replies: &[&str],
) -> (AssistantSession, Arc<ScriptedBackend>) {
    let backend = ScriptedBackend::with_replies(replies);
    let session = AssistantSession::new(sample_task(subtask_count), backend.clone());
    (session, backend)
}

/// Count of assistant messages in the visible history (the greeting is one)
pub fn assistant_count(session: &AssistantSession) -> usize {
    session.messages.iter().filter(|m| !m.is_user).count()
}

/// Poll the session until `reached` holds, letting the driver task run
pub async fn pump_until<F>(session: &mut AssistantSession, mut reached: F)
where
    F: FnMut(&AssistantSession) -> bool,
{
    for _ in 0..500 {
        session.poll_response();
        if reached(session) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    panic!("session did not reach the expected state within the test budget");
}

/// Completion fake for the route-level tests: pops one scripted completion
/// per call
pub struct ScriptedClient {
    completions: Mutex<VecDeque<anyhow::Result<String>>>,
}

impl ScriptedClient {
    pub fn new(completions: Vec<anyhow::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            completions: Mutex::new(completions.into()),
        })
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _messages: &[CompletionMessage]) -> anyhow::Result<String> {
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted completion left")))
    }
}

/// One request captured by [`spawn_http_fake`]
pub struct FakeRequest {
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Serve canned replies on an ephemeral port, one per request, then exit
///
/// Returns the server origin and a handle yielding the captured requests;
/// join it after the last expected request has been answered.
pub fn spawn_http_fake(
    replies: Vec<(u16, String)>,
) -> (String, std::thread::JoinHandle<Vec<FakeRequest>>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().map(|a| a.port()).unwrap();
    let origin = format!("http://127.0.0.1:{}", port);

    let handle = std::thread::spawn(move || {
        let mut received = Vec::new();
        for (status, body) in replies {
            let mut request = server.recv().unwrap();
            let mut request_body = String::new();
            request
                .as_reader()
                .read_to_string(&mut request_body)
                .unwrap();
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.to_string());
            received.push(FakeRequest {
                url: request.url().to_string(),
                authorization,
                body: request_body,
            });

            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    tiny_http::Header::from_bytes("Content-Type", "application/json").unwrap(),
                );
            request.respond(response).unwrap();
        }
        received
    });

    (origin, handle)
}
