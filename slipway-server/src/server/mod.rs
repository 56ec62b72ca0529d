//! Socket listener and connection fan-out
//!
//! One listener accepts every kind of traffic the service speaks: webhook
//! POSTs, log-tail GETs, and inbound SSH. Each accepted connection gets
//! its own task; the shared [`Dispatcher`] decides what the connection
//! wants from its first line.

pub mod dispatcher;
pub mod protocol;
pub mod response;
pub mod ssh;

pub use dispatcher::Dispatcher;

use anyhow::{Context, Result, anyhow};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Binds the listening socket. An address already in use is the one
/// startup failure an operator can fix by waiting, so it gets its own
/// message.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == io::ErrorKind::AddrInUse => Err(anyhow!(err).context(format!(
            "address {addr} is in use; wait for the previous instance to release it and retry"
        ))),
        Err(err) => Err(anyhow!(err).context(format!("failed to bind {addr}"))),
    }
}

/// Accepts connections forever, one task per connection.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> Result<()> {
    loop {
        let (stream, addr) = listener
            .accept()
            .await
            .context("failed to accept connection")?;
        info!("Accepted connection from {}", addr);

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let peer = addr.to_string();
            dispatcher.handle(stream, &peer).await;
        });
    }
}
