//! Ring buffer of bridge events, optionally persisted as JSONL.
//!
//! This complements `tracing`: entries are kept in memory so the server can
//! expose recent activity at `/v1/logs`, and appended to a file so that history
//! survives restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Result;

pub const MAX_LOG_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Where in a bridged call the event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStage {
    Startup,
    Request,
    Transport,
    Response,
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub stage: LogStage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, stage: LogStage, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            stage,
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

pub struct Logger {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    file: Option<(PathBuf, BufWriter<File>)>,
}

impl Logger {
    /// A logger backed by `file_path`; existing entries are reloaded.
    pub fn open(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut logger = Self::in_memory(MAX_LOG_ENTRIES);

        if file_path.exists() {
            let reader = BufReader::new(File::open(&file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
                    logger.push(entry);
                }
            }
        }

        let writer = BufWriter::new(append_handle(&file_path)?);
        logger.file = Some((file_path, writer));
        Ok(logger)
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_LOG_ENTRIES)),
            capacity: capacity.max(1),
            file: None,
        }
    }

    pub fn log(&mut self, entry: LogEntry) {
        if let Some((_, ref mut writer)) = self.file {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{json}");
                let _ = writer.flush();
            }
        }
        self.push(entry);
    }

    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the backing file so it only holds the retained window.
    /// On failure the current writer stays attached.
    pub fn compact(&mut self) -> std::io::Result<()> {
        let Some((ref path, ref mut current)) = self.file else {
            return Ok(());
        };
        current.flush()?;

        let truncated = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(truncated);
        for entry in &self.entries {
            if let Ok(json) = serde_json::to_string(entry) {
                writeln!(writer, "{json}")?;
            }
        }
        writer.flush()?;

        *current = BufWriter::new(append_handle(path)?);
        Ok(())
    }
}

fn append_handle(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::open(file_path)?))))
    }

    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Logger::in_memory(MAX_LOG_ENTRIES))))
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut logger) = self.0.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, stage: LogStage, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, stage, message));
    }

    pub fn warn(&self, stage: LogStage, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, stage, message));
    }

    pub fn log_with_context(
        &self,
        level: LogLevel,
        stage: LogStage,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.log(LogEntry::new(level, stage, message).with_context(context));
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }

    pub fn compact(&self) -> Result<()> {
        match self.0.lock() {
            Ok(mut logger) => Ok(logger.compact()?),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut logger = Logger::in_memory(3);
        for i in 0..5 {
            logger.log(LogEntry::new(LogLevel::Info, LogStage::Request, format!("event {i}")));
        }
        assert_eq!(logger.len(), 3);
        let recent = logger.recent(10);
        assert_eq!(recent[0].message, "event 4");
        assert_eq!(recent[2].message, "event 2");
    }

    #[test]
    fn test_entries_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("bridge.jsonl");

        {
            let logger = SharedLogger::new(&path).unwrap();
            logger.info(LogStage::Startup, "booted");
            logger.log_with_context(
                LogLevel::Warn,
                LogStage::Transport,
                "upstream slow",
                serde_json::json!({"status": 429}),
            );
        }

        let reopened = SharedLogger::new(&path).unwrap();
        let recent = reopened.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].stage, LogStage::Transport);
        assert_eq!(recent[0].context, Some(serde_json::json!({"status": 429})));
        assert_eq!(recent[1].message, "booted");
    }

    #[test]
    fn test_compact_rewrites_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bridge.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        let logger = SharedLogger::new(&path).unwrap();
        logger.log(LogEntry::new(LogLevel::Error, LogStage::Response, "conversion failed"));
        logger.compact().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("conversion failed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_compact_keeps_writing_to_old_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bridge.jsonl");
        let mut logger = Logger::open(&path).unwrap();
        logger.log(LogEntry::new(LogLevel::Info, LogStage::Startup, "booted"));

        // A directory where the file was makes the truncating open fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(logger.compact().is_err());
        assert!(logger.file.is_some());

        logger.log(LogEntry::new(LogLevel::Info, LogStage::Request, "after"));
        assert_eq!(logger.recent(1)[0].message, "after");
    }

    #[test]
    fn test_open_failure_is_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = SharedLogger::new(blocker.join("bridge.jsonl")).err().unwrap();
        assert!(matches!(err, crate::error::BridgeError::Io(_)));
    }
}
