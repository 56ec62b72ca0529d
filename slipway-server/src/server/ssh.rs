//! SSH passthrough
//!
//! A connection whose first line identifies an SSH client is piped to the
//! local SSH daemon untouched. The opening line was already consumed by
//! classification, so it is replayed to the daemon verbatim before the
//! bidirectional byte relay starts. No protocol inspection happens here;
//! either side closing ends the relay.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Relays bytes between the accepted connection and the local SSH
/// endpoint until one side closes.
pub async fn relay<R, W>(
    mut client_read: R,
    mut client_write: W,
    opening: &[u8],
    port: u16,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let upstream = TcpStream::connect(("127.0.0.1", port))
        .await
        .with_context(|| format!("ssh endpoint 127.0.0.1:{port} is unreachable"))?;
    let (mut upstream_read, mut upstream_write) = upstream.into_split();

    upstream_write
        .write_all(opening)
        .await
        .context("failed to forward ssh opening line")?;

    tokio::select! {
        res = tokio::io::copy(&mut client_read, &mut upstream_write) => {
            res.context("client-to-ssh relay failed")?;
        }
        res = tokio::io::copy(&mut upstream_read, &mut client_write) => {
            res.context("ssh-to-client relay failed")?;
        }
    }

    Ok(())
}
