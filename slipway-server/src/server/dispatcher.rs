//! Per-connection request dispatch
//!
//! One dispatcher serves the whole process; `handle` runs once per
//! accepted connection. It reads the first line, classifies it, and routes
//! to the matching handler through the verb enum, so only the three known
//! verbs can ever reach code. Handler failures are logged and tear down
//! only their own connection, and every connection gets a disconnect
//! record no matter how it ended.
//!
//! The webhook handler acknowledges before any engine work happens: the
//! deployment runs as a detached task that reports exclusively through
//! the event log.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::deploy::Orchestrator;
use crate::engine::ContainerEngine;
use crate::server::{protocol, response, ssh};
use crate::server::protocol::Verb;
use crate::server::response::Status;
use crate::store::LogStore;
use crate::webhook;

pub struct Dispatcher {
    engine: Arc<dyn ContainerEngine>,
    store: Arc<LogStore>,
    config: Config,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn ContainerEngine>, store: Arc<LogStore>, config: Config) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    /// Serves one connection to completion. Never panics the listener: a
    /// failing handler is logged, and the disconnect record is appended
    /// on every exit path.
    pub async fn handle<S>(&self, stream: S, peer: &str)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(err) = self.serve(stream, peer).await {
            error!("Connection from {} failed: {:#}", peer, err);
            self.store
                .error(&format!("Connection from {peer} failed: {err:#}"));
        }
        self.store.info(&format!("Client {peer} disconnected"));
    }

    async fn serve<S>(&self, stream: S, peer: &str) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        let mut raw = String::new();
        let n = reader
            .read_line(&mut raw)
            .await
            .context("failed to read request line")?;
        if n == 0 {
            return Ok(());
        }
        let line = raw.trim_end_matches(['\r', '\n']).to_string();
        debug!("{} -> {}", peer, line);

        // A blank opening line is a protocol error and gets answered; a
        // line with an unrecognized verb is merely logged.
        if line.trim().is_empty() {
            let wire = response::respond(Status::BadRequest, "Bot", "Malformed request line");
            return write_half
                .write_all(wire.as_bytes())
                .await
                .context("failed to write response");
        }

        match protocol::classify(&line) {
            Some(Verb::Ssh) => {
                self.store.info(&format!("SSH passthrough for {peer}"));
                // The reader may have buffered bytes beyond the opening
                // line; relaying from it instead of the raw socket keeps
                // them in the stream.
                ssh::relay(reader, write_half, raw.as_bytes(), self.config.ssh_port).await
            }
            Some(Verb::Get) => {
                let wire = self.handle_get(protocol::target_of(&line));
                write_half
                    .write_all(wire.as_bytes())
                    .await
                    .context("failed to write response")
            }
            Some(Verb::Post) => {
                let headers = protocol::read_headers(&mut reader).await?;
                let length = protocol::content_length(&headers);
                let body = protocol::read_body(&mut reader, length).await?;
                let wire = self.handle_post(protocol::target_of(&line), &body);
                write_half
                    .write_all(wire.as_bytes())
                    .await
                    .context("failed to write response")
            }
            None => {
                warn!("Unhandled request line from {}: {}", peer, line);
                self.store.warn(&format!("Unhandled request line: {line}"));
                Ok(())
            }
        }
    }

    /// `/logs` renders the event log tail; everything else gets the
    /// service banner.
    fn handle_get(&self, target: &str) -> String {
        let (path, params) = webhook::parse_target(target);
        match path {
            "/logs" => {
                let limit = params
                    .get("n")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(self.config.tail_default);
                let mut text = String::new();
                for record in self.store.tail(limit) {
                    text.push_str(&record.to_string());
                    text.push('\n');
                }
                response::respond(Status::Ok, "Bot logs", &format!("<pre>\n{text}</pre>"))
            }
            _ => response::respond(Status::Ok, "Bot", "Bot deployment service is running"),
        }
    }

    /// `/git` extracts the deployment coordinates and launches the job
    /// detached; the caller is acknowledged immediately and everything
    /// after that is observable only via `/logs`.
    fn handle_post(&self, target: &str, body: &[u8]) -> String {
        let (path, params) = webhook::parse_target(target);
        if path != "/git" {
            self.store.warn(&format!("POST to unknown path {path}"));
            return response::respond(Status::BadRequest, "Bot", webhook::USAGE);
        }

        let payload = String::from_utf8_lossy(body);
        match webhook::extract(&params, &payload) {
            Ok(request) => {
                let orchestrator =
                    Orchestrator::new(self.engine.clone(), self.store.clone(), &self.config);
                tokio::spawn(async move {
                    orchestrator.start(request).await;
                });
                response::respond(Status::Ok, "Bot", "Git handler posted")
            }
            Err(err) => {
                warn!("Webhook rejected: {}", err);
                self.store.warn(&format!("Webhook rejected: {err}"));
                response::respond(Status::BadRequest, "Bot", webhook::USAGE)
            }
        }
    }
}
