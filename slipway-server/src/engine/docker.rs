//! Docker CLI driver
//!
//! Shells out to the configured engine program with `tokio::process` so a
//! multi-minute image build never stalls the accept loop. The program name
//! defaults to `docker` but anything speaking the same subcommand contract
//! (podman does) works unchanged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::{ContainerEngine, EngineOutput, EngineProcess};

/// Container engine driven through its command-line interface.
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Checks the engine binary is installed and answering.
    pub async fn check_available(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .with_context(|| {
                format!(
                    "failed to execute '{} --version'; is the engine installed?",
                    self.program
                )
            })?;

        if !output.status.success() {
            anyhow::bail!("'{} --version' reported failure", self.program);
        }

        let version = String::from_utf8_lossy(&output.stdout);
        info!("Container engine available: {}", version.trim());

        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    fn program(&self) -> &str {
        &self.program
    }

    async fn invoke(&self, args: Vec<String>) -> Result<EngineOutput> {
        debug!("Invoking {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("failed to execute {} {}", self.program, args.join(" ")))?;

        Ok(EngineOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn(&self, args: Vec<String>) -> Result<Box<dyn EngineProcess>> {
        debug!("Spawning {} {}", self.program, args.join(" "));

        // The launched container's output stays with the engine's own log
        // driver; only the exit code matters here.
        let child = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {} {}", self.program, args.join(" ")))?;

        Ok(Box::new(DockerProcess { child }))
    }
}

struct DockerProcess {
    child: Child,
}

impl EngineProcess for DockerProcess {
    fn try_wait(&mut self) -> Result<Option<i32>> {
        let status = self
            .child
            .try_wait()
            .context("failed to poll engine process status")?;
        Ok(status.map(|s| s.code().unwrap_or(-1)))
    }
}
