//! Event log store
//!
//! Append-only, line-oriented log of everything the service does:
//! deployments, engine invocations, captured command output, client
//! disconnects. Appends are best-effort telemetry: a sink failure is traced
//! and swallowed so a logging problem can never fail an orchestration.
//!
//! The read path tails the log bottom-up, reattaching indented continuation
//! lines to their owning primary line, and hands back the newest records in
//! chronological order.

mod sink;

use slipway_core::domain::log::{CONTINUATION_MARKER, LogEntry, LogLevel, LogRecord};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

use sink::RotatingFileSink;

/// Shared event log.
///
/// One instance is created at startup and handed to every component that
/// records events. Append and the read-and-reassemble pass serialize on the
/// same lock, so a tail never observes a torn multi-line record.
pub struct LogStore {
    sink: Mutex<RotatingFileSink>,
}

impl LogStore {
    /// Creates a store persisting to `path`, rotating at `max_bytes`.
    pub fn new(path: impl AsRef<Path>, max_bytes: u64) -> Self {
        Self {
            sink: Mutex::new(RotatingFileSink::new(path, max_bytes)),
        }
    }

    /// Appends one entry. A multi-line message becomes one record: the
    /// first line prefixed with timestamp and level, the rest indented with
    /// the continuation marker.
    pub fn append(&self, level: LogLevel, message: &str) {
        let entry = LogEntry::new(level, message);
        let mut chunk = entry.to_lines().join("\n");
        chunk.push('\n');

        let sink = self.sink.lock().unwrap();
        if let Err(err) = sink.append(&chunk) {
            warn!("Event log append failed: {:#}", err);
        }
    }

    pub fn info(&self, message: &str) {
        self.append(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.append(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.append(LogLevel::Error, message);
    }

    /// Returns the newest `max` records, oldest first.
    ///
    /// The whole persisted file is read and walked from the end; grouping
    /// survives the reverse walk because continuation lines always sit
    /// between their primary and the next primary. A read failure tails as
    /// empty rather than erroring: the log page is a convenience surface.
    pub fn tail(&self, max: usize) -> Vec<LogRecord> {
        let text = {
            let sink = self.sink.lock().unwrap();
            match sink.read_all() {
                Ok(text) => text,
                Err(err) => {
                    warn!("Event log read failed: {:#}", err);
                    return Vec::new();
                }
            }
        };

        reassemble_tail(&text, max)
    }
}

/// Walks `text` bottom-up and reconstructs up to `max` records, returned in
/// original (chronological) order. Continuation lines above the cut-off
/// whose primary was rotated away are dropped.
fn reassemble_tail(text: &str, max: usize) -> Vec<LogRecord> {
    if max == 0 {
        return Vec::new();
    }

    let mut records: Vec<LogRecord> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for line in text.lines().rev() {
        if line.starts_with(CONTINUATION_MARKER) {
            pending.push(line);
            continue;
        }

        let mut record = LogRecord::new(line);
        record.continuation = pending.drain(..).rev().map(String::from).collect();
        records.push(record);

        if records.len() == max {
            break;
        }
    }

    records.reverse();
    records
}
