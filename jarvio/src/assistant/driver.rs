//! HTTP side of `AssistantBackend`: posts turns to the proxy endpoint
//!
//! No request timeout and no retry are configured; a hung upstream keeps the
//! session in its awaiting state until the process is restarted.

use jarvio_sdk::{
    async_trait, AssistantBackend, AssistantRequest, AssistantResponse, BackendResult,
};

/// Assistant backend that talks to a running Jarvio server
pub struct HttpAssistant {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpAssistant {
    /// `base` is the server origin, e.g. `http://127.0.0.1:8787`
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/jarvio-assistant", base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl AssistantBackend for HttpAssistant {
    async fn respond(&self, request: AssistantRequest) -> BackendResult<AssistantResponse> {
        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("error")
                        .and_then(|error| error.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(format!("assistant endpoint returned {}: {}", status, detail).into());
        }
        Ok(response.json::<AssistantResponse>().await?)
    }
}
