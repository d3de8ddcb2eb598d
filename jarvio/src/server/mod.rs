//! HTTP front end for the dashboard API
//!
//! `tiny_http` does blocking socket I/O, so the accept loop hands receive
//! and respond to `spawn_blocking` and keeps handler work async in between.
//! Requests are handled one at a time, which keeps the SQLite store free of
//! locking.

mod routes;

pub use routes::{HandlerReply, JarvioRoutes};

use std::io::Read;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use jarvio_sdk::{log_error, log_info};

/// Serves [`JarvioRoutes`] over plain HTTP
pub struct JarvioServer {
    bind: String,
    routes: JarvioRoutes,
}

impl JarvioServer {
    pub fn new(bind: String, routes: JarvioRoutes) -> Self {
        Self { bind, routes }
    }

    /// Bind and serve until the process is stopped
    pub async fn run(self) -> Result<()> {
        let server = tiny_http::Server::http(&self.bind)
            .map_err(|e| anyhow!("failed to bind {}: {}", self.bind, e))?;
        let server = Arc::new(server);
        log_info!("Listening on http://{}", self.bind);

        loop {
            let accepted = {
                let server = server.clone();
                tokio::task::spawn_blocking(move || receive_request(&server))
                    .await
                    .context("accept worker panicked")?
            };

            let (request, body) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    log_error!("Failed to read request: {}", e);
                    continue;
                }
            };

            let method = request.method().to_string();
            let url = request.url().to_string();
            let reply = self.routes.dispatch(&method, &url, &body).await;
            log_info!("{} {} -> {}", method, url, reply.status);

            tokio::task::spawn_blocking(move || send_reply(request, reply))
                .await
                .context("respond worker panicked")?;
        }
    }
}

/// Block until the next request arrives and read its body
fn receive_request(server: &tiny_http::Server) -> Result<(tiny_http::Request, String)> {
    let mut request = server.recv()?;
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body)?;
    Ok((request, body))
}

fn send_reply(request: tiny_http::Request, reply: HandlerReply) {
    let response = tiny_http::Response::from_string(reply.body)
        .with_status_code(reply.status)
        .with_header(tiny_http::Header::from_bytes("Content-Type", "application/json").unwrap());
    if let Err(e) = request.respond(response) {
        log_error!("Failed to send response: {}", e);
    }
}
