//! Server configuration
//!
//! Defines all configurable parameters for the listener: bind address, the
//! event log sink, the SSH relay upstream, the engine program, and the
//! monitoring cadence. Values come from command-line flags with environment
//! fallbacks and are validated once at startup.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the Slipway server.
#[derive(Debug, Parser)]
#[command(name = "slipway-server")]
#[command(about = "Webhook-triggered container build-and-run daemon", long_about = None)]
pub struct Args {
    /// Address the listener binds to
    #[arg(long, env = "SLIPWAY_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// Path of the append-only event log
    #[arg(long, env = "SLIPWAY_LOG_FILE", default_value = "slipway.log")]
    pub log_file: PathBuf,

    /// Size in bytes at which the event log rotates to its single backup
    #[arg(long, env = "SLIPWAY_LOG_MAX_BYTES", default_value_t = 1_048_576)]
    pub log_max_bytes: u64,

    /// Local port SSH lines are relayed to
    #[arg(long, env = "SLIPWAY_SSH_PORT", default_value_t = 22002)]
    pub ssh_port: u16,

    /// Container engine program invoked for build/stop/prune/run
    #[arg(long, env = "SLIPWAY_ENGINE", default_value = "docker")]
    pub engine: String,

    /// Seconds before the first status poll after a container launch
    #[arg(long, env = "SLIPWAY_POLL_INITIAL_SECS", default_value_t = 2)]
    pub poll_initial_secs: u64,

    /// Seconds between steady-state status polls
    #[arg(long, env = "SLIPWAY_POLL_STEADY_SECS", default_value_t = 20)]
    pub poll_steady_secs: u64,

    /// Number of records `/logs` returns when no count is given
    #[arg(long, env = "SLIPWAY_TAIL_DEFAULT", default_value_t = 50)]
    pub tail_default: usize,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// Path of the append-only event log.
    pub log_file: PathBuf,

    /// Size cap for the event log before it rotates.
    pub log_max_bytes: u64,

    /// Local port the SSH passthrough connects to.
    pub ssh_port: u16,

    /// Container engine program name.
    pub engine_program: String,

    /// Delay before the first status poll after launch.
    pub poll_initial: Duration,

    /// Delay between steady-state status polls.
    pub poll_steady: Duration,

    /// Default number of records returned by the log tail endpoint.
    pub tail_default: usize,
}

impl Config {
    /// Resolves parsed arguments into a configuration.
    pub fn from_args(args: Args) -> Self {
        Self {
            bind_addr: args.bind_addr,
            log_file: args.log_file,
            log_max_bytes: args.log_max_bytes,
            ssh_port: args.ssh_port,
            engine_program: args.engine,
            poll_initial: Duration::from_secs(args.poll_initial_secs),
            poll_steady: Duration::from_secs(args.poll_steady_secs),
            tail_default: args.tail_default,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if !self.bind_addr.contains(':') {
            anyhow::bail!("bind_addr must be of the form host:port");
        }

        if self.engine_program.is_empty() {
            anyhow::bail!("engine program cannot be empty");
        }

        if self.log_max_bytes == 0 {
            anyhow::bail!("log_max_bytes must be greater than 0");
        }

        if self.poll_steady.as_secs() == 0 {
            anyhow::bail!("poll_steady must be greater than 0");
        }

        if self.tail_default == 0 {
            anyhow::bail!("tail_default must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            log_file: PathBuf::from("slipway.log"),
            log_max_bytes: 1_048_576,
            ssh_port: 22002,
            engine_program: "docker".to_string(),
            poll_initial: Duration::from_secs(2),
            poll_steady: Duration::from_secs(20),
            tail_default: 50,
        }
    }
}
