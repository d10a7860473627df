use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Default in-memory retention for pipeline log lines.
pub const DEFAULT_LOG_RETENTION: usize = 10_000;

/// Severity levels honored by the pipeline logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the canonical uppercase representation.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct LogRecord<'a> {
    seq: u64,
    level: &'static str,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    vbucket: Option<u16>,
    message: &'a str,
}

#[derive(Debug)]
struct LogBuffer {
    level: LogLevel,
    max_lines: usize,
    lines: VecDeque<String>,
}

/// Clone-able JSON-line logger shared by the tracker and its collaborators.
///
/// Lines are stamped with a monotonic sequence counter instead of wall-clock
/// time so output stays deterministic under test. Retention is a bounded ring;
/// the oldest lines are evicted first.
#[derive(Debug, Clone)]
pub struct PipelineLog {
    topic: Arc<String>,
    seq: Arc<AtomicU64>,
    buffer: Arc<Mutex<LogBuffer>>,
}

impl PipelineLog {
    /// Creates a logger for the named replication topic with default retention.
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_retention(topic, DEFAULT_LOG_RETENTION)
    }

    /// Creates a logger with an explicit line-retention cap.
    pub fn with_retention(topic: impl Into<String>, max_lines: usize) -> Self {
        Self {
            topic: Arc::new(topic.into()),
            seq: Arc::new(AtomicU64::new(0)),
            buffer: Arc::new(Mutex::new(LogBuffer {
                level: LogLevel::Info,
                max_lines: max_lines.max(1),
                lines: VecDeque::new(),
            })),
        }
    }

    /// Replication topic the logger is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Current severity threshold.
    pub fn level(&self) -> LogLevel {
        self.buffer.lock().unwrap().level
    }

    /// Applies a dynamic severity override.
    pub fn set_level(&self, level: LogLevel) {
        self.buffer.lock().unwrap().level = level;
    }

    /// Emits a JSON-line record if `level` clears the threshold.
    pub fn log(&self, level: LogLevel, vbucket: Option<u16>, message: &str) {
        let mut buffer = self.buffer.lock().unwrap();
        if level < buffer.level {
            return;
        }
        let record = LogRecord {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            level: level.as_str(),
            topic: &self.topic,
            vbucket,
            message,
        };
        let line = serde_json::to_string(&record)
            .unwrap_or_else(|_| format!("{{\"level\":\"{}\"}}", level.as_str()));
        if buffer.lines.len() == buffer.max_lines {
            buffer.lines.pop_front();
        }
        buffer.lines.push_back(line);
    }

    /// Debug-level record scoped to one vbucket.
    pub fn debug(&self, vbucket: u16, message: &str) {
        self.log(LogLevel::Debug, Some(vbucket), message);
    }

    /// Info-level record for topic-wide events.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, None, message);
    }

    /// Snapshot of the retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.buffer.lock().unwrap().lines.iter().cloned().collect()
    }
}
