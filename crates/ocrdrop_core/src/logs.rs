use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Server levels are Python logging names; anything unrecognised renders as info.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ERROR" | "CRITICAL" => LogLevel::Error,
            "WARNING" | "WARN" => LogLevel::Warning,
            _ => LogLevel::Info,
        }
    }
}

/// Dedup key of a server log line. The server may send either form.
#[derive(Debug, Clone, PartialEq)]
pub enum LogTimestamp {
    Numeric(f64),
    Text(String),
}

impl LogTimestamp {
    /// Numbers compare numerically, text lexically; mixed pairs fall back to
    /// comparing their rendered text.
    pub fn is_after(&self, other: &LogTimestamp) -> bool {
        let ordering = match (self, other) {
            (LogTimestamp::Numeric(a), LogTimestamp::Numeric(b)) => a.partial_cmp(b),
            (LogTimestamp::Text(a), LogTimestamp::Text(b)) => Some(a.cmp(b)),
            (a, b) => Some(a.to_string().cmp(&b.to_string())),
        };
        ordering == Some(Ordering::Greater)
    }
}

impl fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTimestamp::Numeric(value) => write!(f, "{value}"),
            LogTimestamp::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: LogTimestamp,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: LogTimestamp, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }
}

/// Remembers the newest timestamp appended so far; `/logs` is cumulative.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogCursor {
    last: Option<LogTimestamp>,
}

impl LogCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entries strictly newer than everything accepted before,
    /// in arrival order.
    pub fn accept(&mut self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        let mut fresh = Vec::new();
        for entry in entries {
            let is_new = match &self.last {
                None => true,
                Some(last) => entry.timestamp.is_after(last),
            };
            if is_new {
                self.last = Some(entry.timestamp.clone());
                fresh.push(entry);
            }
        }
        fresh
    }

    pub fn last(&self) -> Option<&LogTimestamp> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// A line ready for the log view. Client-generated lines carry no timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub timestamp: Option<String>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            level: LogLevel::Info,
            message: message.into(),
        }
    }
}

impl From<LogEntry> for LogLine {
    fn from(entry: LogEntry) -> Self {
        Self {
            timestamp: Some(entry.timestamp.to_string()),
            level: entry.level,
            message: entry.message,
        }
    }
}
