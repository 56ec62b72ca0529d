//! Event log domain types
//!
//! The event log is line oriented: an entry is rendered as one non-indented
//! primary line (timestamp, level, first message line) followed by one
//! indented line per remaining message line. The indent is the continuation
//! marker the tail side uses to reattach lines to their owning record.

use serde::{Deserialize, Serialize};

/// Leading-whitespace marker identifying a continuation line.
pub const CONTINUATION_MARKER: &str = "    ";

/// Severity of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One event as appended: a timestamp, a level, and a possibly multi-line
/// message. Rendering flattens it into primary + continuation lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            message: message.into(),
        }
    }

    /// Renders the entry into physical log lines: the first message line is
    /// prefixed with timestamp and level, every further line with the
    /// continuation marker.
    pub fn to_lines(&self) -> Vec<String> {
        let stamp = self
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let mut lines = Vec::new();
        for (idx, line) in self.message.lines().enumerate() {
            if idx == 0 {
                lines.push(format!("{} {} {}", stamp, self.level, line));
            } else {
                lines.push(format!("{}{}", CONTINUATION_MARKER, line));
            }
        }
        // An empty message still produces a primary line.
        if lines.is_empty() {
            lines.push(format!("{} {} ", stamp, self.level));
        }
        lines
    }
}

/// One reconstructed record from the tail side: the primary line and the
/// continuation lines that were appended as part of the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub primary: String,
    pub continuation: Vec<String>,
}

impl LogRecord {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            continuation: Vec::new(),
        }
    }
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.primary)?;
        for line in &self.continuation {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}
