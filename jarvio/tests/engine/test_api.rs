//! HTTP clients and end-to-end route wiring
//!
//! The route handlers are unit tested inside the crate; these tests cover
//! the pieces that only show up on a real socket: the OpenAI client's wire
//! requests, the HTTP assistant driver, and the dispatcher wired to a real
//! on-disk store and a real completion client.

use std::sync::Arc;

use super::common::*;
use jarvio::assistant::{AssistantSession, HttpAssistant, InputGate};
use jarvio::config::Config;
use jarvio::flowgen::FlowGenerator;
use jarvio::llm::{CompletionClient, CompletionMessage, OpenAiClient};
use jarvio::proxy::OpenAiAssistant;
use jarvio::server::JarvioRoutes;
use jarvio::settings::SettingsService;
use jarvio::store::Database;
use jarvio_sdk::{
    AssistantBackend, AssistantRequest, ChatMessage, FlowDraft, TaskContext,
};

fn test_config(api_key: Option<&str>, base_url: &str) -> Config {
    Config {
        api_key: api_key.map(String::from),
        model: "gpt-4o-mini".to_string(),
        base_url: base_url.to_string(),
        bind: "127.0.0.1:0".to_string(),
        db_path: std::env::temp_dir().join("jarvio_engine_test_unused.db"),
    }
}

fn assistant_request(message: &str) -> AssistantRequest {
    let task = sample_task(2);
    AssistantRequest {
        message: message.to_string(),
        task_context: TaskContext {
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
        },
        subtasks: task.subtasks,
        current_subtask_index: 0,
        conversation_history: vec![ChatMessage::user("hi".to_string())],
    }
}

// ============================================================================
// OpenAI Upstream
// ============================================================================

#[tokio::test]
async fn test_openai_client_round_trip_with_bearer_auth() {
    let (origin, handle) = spawn_http_fake(vec![(
        200,
        r#"{"choices":[{"message":{"content":"  Here is the plan.\n"}}]}"#.to_string(),
    )]);

    let client = OpenAiClient::new(&test_config(Some("test-key"), &format!("{}/v1", origin)));
    let reply = client
        .complete(&[
            CompletionMessage::system("You are Jarvio.".to_string()),
            CompletionMessage::user("go".to_string()),
        ])
        .await
        .unwrap();
    assert_eq!(reply, "Here is the plan.");

    let received = handle.join().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].url, "/v1/chat/completions");
    assert_eq!(received[0].authorization.as_deref(), Some("Bearer test-key"));

    let body: serde_json::Value = serde_json::from_str(&received[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "go");
}

#[tokio::test]
async fn test_openai_client_surfaces_upstream_error() {
    let (origin, handle) = spawn_http_fake(vec![(
        429,
        r#"{"error":{"message":"rate limited"}}"#.to_string(),
    )]);

    let client = OpenAiClient::new(&test_config(Some("test-key"), &format!("{}/v1", origin)));
    let err = client
        .complete(&[CompletionMessage::user("go".to_string())])
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("429"), "got: {}", message);
    assert!(message.contains("rate limited"), "got: {}", message);

    handle.join().unwrap();
}

#[tokio::test]
async fn test_missing_api_key_fails_without_a_request() {
    // Nothing listens on this origin; the key check must fire first
    let client = OpenAiClient::new(&test_config(None, "http://127.0.0.1:9/v1"));
    let err = client
        .complete(&[CompletionMessage::user("go".to_string())])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

// ============================================================================
// Server Wiring
// ============================================================================

fn routes_backed_by(config: &Config, db_path: std::path::PathBuf) -> JarvioRoutes {
    let store = Database::new(db_path).unwrap();
    store.initialize_schema().unwrap();

    let settings = SettingsService::new();
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(config));
    JarvioRoutes::new(
        OpenAiAssistant::new(client.clone(), settings.scope("jarvio-assistant")),
        FlowGenerator::new(client, settings.scope("generate-flow")),
        store,
    )
}

#[tokio::test]
async fn test_generate_flow_falls_back_end_to_end() {
    let temp_dir = create_temp_dir("generate_e2e");
    let (origin, handle) = spawn_http_fake(vec![(
        200,
        r#"{"choices":[{"message":{"content":"I cannot produce JSON today."}}]}"#.to_string(),
    )]);

    let config = test_config(Some("test-key"), &format!("{}/v1", origin));
    let routes = routes_backed_by(&config, temp_dir.join("jarvio.db"));

    let reply = routes
        .dispatch(
            "POST",
            "/api/generate-flow",
            r#"{"prompt":"help me restock best sellers","type":"flow"}"#,
        )
        .await;
    assert_eq!(reply.status, 200);

    let draft: FlowDraft = serde_json::from_str(&reply.body).unwrap();
    assert!(draft.validate().is_ok());
    assert_eq!(draft.name, "Help me restock best sellers");

    let received = handle.join().unwrap();
    assert_eq!(received[0].url, "/v1/chat/completions");

    cleanup_temp_dir(&temp_dir);
}

#[tokio::test]
async fn test_endpoints_without_key_answer_500_naming_the_variable() {
    let temp_dir = create_temp_dir("missing_key");
    let config = test_config(None, "http://127.0.0.1:9/v1");
    let routes = routes_backed_by(&config, temp_dir.join("jarvio.db"));

    let body = serde_json::to_string(&assistant_request("go")).unwrap();
    let reply = routes.dispatch("POST", "/api/jarvio-assistant", &body).await;
    assert_eq!(reply.status, 500);
    let error: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("OPENAI_API_KEY"));

    // Generation has no fallback for provider failures either
    let reply = routes
        .dispatch("POST", "/api/generate-flow", r#"{"prompt":"x","type":"flow"}"#)
        .await;
    assert_eq!(reply.status, 500);

    cleanup_temp_dir(&temp_dir);
}

// ============================================================================
// HTTP Driver
// ============================================================================

#[tokio::test]
async fn test_http_assistant_parses_the_wire_response() {
    let (origin, handle) = spawn_http_fake(vec![(
        200,
        concat!(
            r#"{"reply":"Checked stock.\nSUBTASK COMPLETE","subtaskComplete":true,"#,
            r#""approvalNeeded":false,"collectedData":"3 SKUs low","userWorkLog":null}"#,
        )
        .to_string(),
    )]);

    let driver = HttpAssistant::new(&origin);
    let response = driver.respond(assistant_request("go")).await.unwrap();
    assert!(response.subtask_complete);
    assert!(!response.approval_needed);
    assert_eq!(response.collected_data.as_deref(), Some("3 SKUs low"));

    let received = handle.join().unwrap();
    assert_eq!(received[0].url, "/api/jarvio-assistant");
    // Requests go out in the dashboard's camelCase shape
    assert!(received[0].body.contains("\"currentSubtaskIndex\":0"));
    assert!(received[0].body.contains("\"taskContext\""));
}

#[tokio::test]
async fn test_http_assistant_surfaces_error_replies() {
    let (origin, handle) = spawn_http_fake(vec![(
        500,
        r#"{"error":"OPENAI_API_KEY is not set"}"#.to_string(),
    )]);

    let driver = HttpAssistant::new(&origin);
    let err = driver.respond(assistant_request("go")).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("500"), "got: {}", message);
    assert!(message.contains("OPENAI_API_KEY is not set"), "got: {}", message);

    handle.join().unwrap();
}

#[tokio::test]
async fn test_session_completes_a_subtask_through_the_http_driver() {
    let (origin, handle) = spawn_http_fake(vec![(
        200,
        concat!(
            r#"{"reply":"Restock submitted.\nSUBTASK COMPLETE","subtaskComplete":true,"#,
            r#""approvalNeeded":false,"collectedData":null,"userWorkLog":null}"#,
        )
        .to_string(),
    )]);

    let mut session = AssistantSession::new(
        sample_task(2),
        Arc::new(HttpAssistant::new(&origin)),
    );
    session.send_message("go");
    pump_until(&mut session, |s| s.task.subtasks[0].done).await;

    assert_eq!(session.current_subtask(), 0);
    assert_eq!(
        session.gate(),
        &InputGate::FeedbackPrompt { subtask_index: 0 }
    );

    let received = handle.join().unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.contains("\"currentSubtaskIndex\":0"));
}
