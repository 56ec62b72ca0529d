//! Rotating file sink
//!
//! The event log's persistence: a single append-only file with a size cap.
//! When an append would push the file past the cap, the current file is
//! renamed over the one retained `.1` backup and a fresh file is started.
//! Readers only ever see the current generation.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Size-capped append-only file with one backup generation.
pub struct RotatingFileSink {
    path: PathBuf,
    backup_path: PathBuf,
    max_bytes: u64,
}

impl RotatingFileSink {
    /// Creates a sink for `path`, rotating to `{path}.1` at `max_bytes`.
    pub fn new(path: impl AsRef<Path>, max_bytes: u64) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut backup: OsString = path.clone().into_os_string();
        backup.push(".1");
        Self {
            path,
            backup_path: PathBuf::from(backup),
            max_bytes,
        }
    }

    /// Appends one chunk, rotating first when the write would exceed the cap.
    ///
    /// A chunk larger than the cap on its own still lands in a fresh file;
    /// the cap bounds steady growth, not a single record.
    pub fn append(&self, chunk: &str) -> Result<()> {
        if self.would_exceed(chunk.len() as u64) {
            self.rotate()?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open event log {}", self.path.display()))?;

        file.write_all(chunk.as_bytes())
            .with_context(|| format!("failed to append to event log {}", self.path.display()))
    }

    /// Reads the current generation in full. A missing file reads as empty.
    pub fn read_all(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read event log {}", self.path.display())),
        }
    }

    fn would_exceed(&self, additional: u64) -> bool {
        let current = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        current > 0 && current + additional > self.max_bytes
    }

    fn rotate(&self) -> Result<()> {
        match fs::rename(&self.path, &self.backup_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!(
                    "failed to rotate event log {} to {}",
                    self.path.display(),
                    self.backup_path.display()
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("events.log"), 1024);

        sink.append("first line\n").unwrap();
        sink.append("second line\n").unwrap();

        assert_eq!(sink.read_all().unwrap(), "first line\nsecond line\n");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("events.log"), 1024);
        assert_eq!(sink.read_all().unwrap(), "");
    }

    #[test]
    fn test_rotation_keeps_one_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let sink = RotatingFileSink::new(&path, 32);

        sink.append("aaaaaaaaaaaaaaaaaaaaaaaa\n").unwrap(); // 25 bytes
        sink.append("bbbbbbbbbbbbbbbbbbbbbbbb\n").unwrap(); // would exceed: rotates
        sink.append("c\n").unwrap();

        assert_eq!(sink.read_all().unwrap(), "bbbbbbbbbbbbbbbbbbbbbbbb\nc\n");
        let backup = fs::read_to_string(dir.path().join("events.log.1")).unwrap();
        assert_eq!(backup, "aaaaaaaaaaaaaaaaaaaaaaaa\n");
    }

    #[test]
    fn test_second_rotation_replaces_backup() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("events.log"), 8);

        sink.append("first\n").unwrap();
        sink.append("second\n").unwrap(); // rotation 1
        sink.append("third\n").unwrap(); // rotation 2

        let backup = fs::read_to_string(dir.path().join("events.log.1")).unwrap();
        assert_eq!(backup, "second\n");
        assert_eq!(sink.read_all().unwrap(), "third\n");
    }

    #[test]
    fn test_oversized_chunk_still_lands() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("events.log"), 4);

        sink.append("a much longer chunk than the cap\n").unwrap();
        assert_eq!(sink.read_all().unwrap(), "a much longer chunk than the cap\n");
    }
}
