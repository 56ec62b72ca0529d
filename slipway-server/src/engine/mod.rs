//! Container engine boundary
//!
//! The engine is consumed strictly through its command-line contract:
//! `build --tag {repo}:{tag} {context}`, `container ls -aq`,
//! `container stop {id}`, `container wait {id}`, `container prune -f`,
//! `run {repo}:{tag}`. The trait keeps that contract as the seam so the
//! lifecycle state machine can be exercised against a scripted engine.

mod docker;

#[cfg(test)]
pub mod fake;

pub use docker::DockerCli;

use anyhow::Result;
use async_trait::async_trait;

/// Captured result of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A detached engine process that can be polled for completion.
pub trait EngineProcess: Send {
    /// Returns the exit code once the process has terminated, `None` while
    /// it is still running.
    fn try_wait(&mut self) -> Result<Option<i32>>;
}

/// Container engine consumed through its CLI contract.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Program name, used verbatim in event log lines.
    fn program(&self) -> &str;

    /// Runs one engine subcommand to completion, capturing its output.
    async fn invoke(&self, args: Vec<String>) -> Result<EngineOutput>;

    /// Spawns one engine subcommand without waiting for it.
    async fn spawn(&self, args: Vec<String>) -> Result<Box<dyn EngineProcess>>;
}

/// Builds an owned argument vector for an engine subcommand.
pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
