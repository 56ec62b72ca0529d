//! Slipway Server
//!
//! A webhook-triggered deployment daemon for a single-tenant container
//! host.
//!
//! Architecture:
//! - Configuration: command-line flags with environment fallbacks
//! - Store: append-only event log with size-capped rotation and tailing
//! - Engine: the container engine driven through its command-line contract
//! - Deploy: the per-job build/stop/prune/run/monitor lifecycle
//! - Server: one listener classifying SSH, GET, and POST traffic
//!
//! A push webhook lands as a POST, gets acknowledged immediately, and the
//! deployment runs detached; its progress is readable over GET `/logs`.
//! Lines from SSH clients are relayed to the local daemon so the host can
//! share one public port.

mod config;
mod deploy;
mod engine;
mod server;
mod store;
mod webhook;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Args, Config};
use crate::engine::DockerCli;
use crate::server::Dispatcher;
use crate::store::LogStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slipway_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Slipway");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: bind_addr={}, engine={}, log_file={}",
        config.bind_addr,
        config.engine_program,
        config.log_file.display()
    );

    // Initialize the event log
    let store = Arc::new(LogStore::new(&config.log_file, config.log_max_bytes));

    // Verify the container engine responds before accepting webhooks
    let engine = DockerCli::new(&config.engine_program);
    if let Err(err) = engine.check_available().await {
        error!("Container engine check failed: {:#}", err);
        return Err(err).context("container engine is not usable");
    }
    let engine = Arc::new(engine);

    let dispatcher = Arc::new(Dispatcher::new(engine, store.clone(), config.clone()));
    info!("Dispatcher initialized");

    // Bind the listener; startup failures here are fatal
    let listener = match server::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Startup failed: {:#}", err);
            return Err(err);
        }
    };
    info!("Listening on {}", config.bind_addr);
    store.info(&format!("Service listening on {}", config.bind_addr));

    // Accept connections until the process is stopped
    if let Err(err) = server::serve(listener, dispatcher).await {
        error!("Listener error: {:#}", err);
        store.error(&format!("Listener error: {err:#}"));
        return Err(err);
    }

    Ok(())
}

/// Parses and validates configuration from command line and environment
fn load_config() -> Result<Config> {
    let args = Args::parse();
    let config = Config::from_args(args);
    config.validate()?;
    Ok(config)
}
