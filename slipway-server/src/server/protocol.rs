//! Request line and header parsing
//!
//! The wire protocol is line oriented, not full HTTP. The first line of a
//! connection decides everything: a line starting with `SSH` is a relay
//! marker (real SSH clients open with `SSH-2.0-...`, so the match is on
//! the prefix, not the first token), `GET` and `POST` look like HTTP
//! request lines. Only POST carries headers and a body.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Ssh,
    Get,
    Post,
}

/// Classifies the first line of a connection. `None` means no handler
/// matches; the caller logs the line and answers nothing.
pub fn classify(line: &str) -> Option<Verb> {
    if line.starts_with("SSH") {
        return Some(Verb::Ssh);
    }
    match line.split_whitespace().next()? {
        "GET" => Some(Verb::Get),
        "POST" => Some(Verb::Post),
        _ => None,
    }
}

/// Second whitespace token of the request line; a bare verb targets `/`.
pub fn target_of(line: &str) -> &str {
    line.split_whitespace().nth(1).unwrap_or("/")
}

/// Reads `Name: value` lines until the empty terminator line or EOF.
/// Names are lowercased; malformed lines without a colon are skipped.
pub async fn read_headers<R>(reader: &mut R) -> Result<HashMap<String, String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HashMap::new();
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .await
            .context("failed to read header line")?;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if n == 0 || trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(headers)
}

/// Declared payload size. Absent or non-numeric means zero, so a sender
/// that omits the header gets an empty payload instead of a read that
/// never completes.
pub fn content_length(headers: &HashMap<String, String>) -> usize {
    headers
        .get("content-length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Reads exactly `len` payload bytes.
pub async fn read_body<R>(reader: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("connection closed before full payload arrived")?;
    Ok(body)
}
