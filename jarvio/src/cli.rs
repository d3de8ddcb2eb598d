//! Command-line arguments for the jarvio server

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Amazon-seller dashboard backend with an LLM task assistant
#[derive(Parser, Debug, Clone)]
#[command(name = "jarvio")]
#[command(about = "Amazon-seller dashboard backend with an LLM task assistant")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Chat-completions model to use
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,
}

impl Args {
    /// Environment configuration with these overrides applied on top
    pub fn into_config(self) -> Config {
        let mut config = Config::from_env();
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        config
    }
}
