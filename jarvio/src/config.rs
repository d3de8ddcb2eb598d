//! Runtime configuration
//!
//! Settings come from the process environment (loaded through dotenv at
//! startup) with CLI overrides applied on top. A missing API key is not a
//! startup error: the server runs without it and every assistant or
//! generation request fails with HTTP 500 until it is provided.

use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key; None leaves the endpoints returning 500
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub bind: String,
    pub db_path: PathBuf,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("JARVIO_OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("JARVIO_OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            bind: DEFAULT_BIND.to_string(),
            db_path: default_db_path(),
        }
    }
}

/// Default SQLite database location in the platform data directory
pub fn default_db_path() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "jarvio", "jarvio") {
        proj_dirs.data_dir().join("jarvio.db")
    } else {
        PathBuf::from(".jarvio.db")
    }
}
