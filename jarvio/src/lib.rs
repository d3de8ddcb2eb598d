//! Jarvio dashboard backend
//!
//! Serves an Amazon-seller dashboard's API: an OpenAI proxy for the task
//! assistant, a flow generation endpoint, and CRUD over tasks, flows, and
//! work logs backed by SQLite. The [`assistant`] module holds the session
//! engine that drives subtask progression from the assistant's marker
//! replies; it talks to the same API over HTTP and is embedded by clients.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod flowgen;
pub mod llm;
pub mod notifications;
pub mod prompts;
pub mod proxy;
pub mod server;
pub mod settings;
pub mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use jarvio_sdk::{log_info, log_warning};

use cli::Args;
use flowgen::FlowGenerator;
use llm::{CompletionClient, OpenAiClient};
use proxy::OpenAiAssistant;
use server::{JarvioRoutes, JarvioServer};
use settings::SettingsService;
use store::Database;

/// Wire configuration, store, and endpoints together and serve until the
/// process is stopped
pub async fn run(args: Args) -> Result<()> {
    let config = args.into_config();

    let store = Database::new(config.db_path.clone())
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;
    store.initialize_schema()?;
    log_info!(
        "Database ready at {} (schema v{})",
        config.db_path.display(),
        store.get_schema_version()?
    );

    if config.api_key.is_none() {
        log_warning!("OPENAI_API_KEY is not set; assistant and generation requests will fail");
    }

    let settings = SettingsService::new();
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(&config));
    let assistant = OpenAiAssistant::new(client.clone(), settings.scope("jarvio-assistant"));
    let generator = FlowGenerator::new(client, settings.scope("generate-flow"));

    let routes = JarvioRoutes::new(assistant, generator, store);
    JarvioServer::new(config.bind.clone(), routes).run().await
}
