//! Operational event log
//!
//! Every event is appended to an in-memory history owned by the host; events
//! at or above the configured threshold are also printed. Each record is
//! mirrored to `tracing` so the usual subscriber sees it too.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;

/// Timestamp layout used in printed records: `YYMMDD.HHMMSS.micros`
const TIMESTAMP_FORMAT: &str = "%y%m%d.%H%M%S.%6f";

/// Severity of an event, low to high
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 1,
    Info = 2,
    #[default]
    Notice = 3,
    Warning = 4,
    Error = 5,
}

impl LogLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(LogLevel::Debug),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Notice),
            4 => Some(LogLevel::Warning),
            5 => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Accepts either the level name or its number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return LogLevel::from_u8(n).ok_or_else(|| format!("Unknown log level: {}", s));
        }
        match trimmed.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// A single logged event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub message: String,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
    pub logged_at: DateTime<Local>,
}

impl LogRecord {
    pub fn timestamp(&self) -> String {
        self.logged_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}] {} {}",
            self.timestamp(),
            self.level.as_u8(),
            self.probe.as_deref().unwrap_or(""),
            self.message
        )
    }
}

struct EventLogInner {
    threshold: Mutex<LogLevel>,
    records: Mutex<Vec<LogRecord>>,
    sink: Mutex<Box<dyn Write + Send>>,
}

/// Cloneable handle to a host's event log
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

impl EventLog {
    /// Event log printing to stdout
    pub fn new(threshold: LogLevel) -> Self {
        Self::with_writer(threshold, Box::new(io::stdout()))
    }

    pub fn with_writer(threshold: LogLevel, sink: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                threshold: Mutex::new(threshold),
                records: Mutex::new(Vec::new()),
                sink: Mutex::new(sink),
            }),
        }
    }

    pub fn threshold(&self) -> LogLevel {
        *self.inner.threshold.lock()
    }

    pub fn set_threshold(&self, threshold: LogLevel) {
        *self.inner.threshold.lock() = threshold;
    }

    /// Record an event; `level` defaults to INFO
    pub fn log(&self, message: impl Into<String>, level: Option<LogLevel>, probe: Option<&str>) {
        let record = LogRecord {
            message: message.into(),
            level: level.unwrap_or(LogLevel::Info),
            probe: probe.map(str::to_string),
            logged_at: Local::now(),
        };

        mirror_to_tracing(&record);

        if record.level >= self.threshold() {
            let mut sink = self.inner.sink.lock();
            if let Err(e) = writeln!(sink, "{}", record) {
                tracing::warn!("Failed to print log record: {}", e);
            }
        }

        self.inner.records.lock().push(record);
    }

    /// Copy of the full history, oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.inner.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle that tags every event with a probe name
    pub fn for_probe(&self, probe: impl Into<String>) -> ProbeLog {
        ProbeLog {
            log: self.clone(),
            probe: probe.into(),
        }
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("threshold", &self.threshold())
            .field("records", &self.len())
            .finish()
    }
}

/// Event log bound to one probe
#[derive(Clone, Debug)]
pub struct ProbeLog {
    log: EventLog,
    probe: String,
}

impl ProbeLog {
    pub fn log(&self, message: impl Into<String>, level: Option<LogLevel>) {
        self.log.log(message, level, Some(&self.probe));
    }
}

fn mirror_to_tracing(record: &LogRecord) {
    let probe = record.probe.as_deref().unwrap_or("-");
    match record.level {
        LogLevel::Debug => tracing::debug!(probe, "{}", record.message),
        LogLevel::Info | LogLevel::Notice => tracing::info!(probe, "{}", record.message),
        LogLevel::Warning => tracing::warn!(probe, "{}", record.message),
        LogLevel::Error => tracing::error!(probe, "{}", record.message),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writer whose output can be inspected after the fact
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).to_string()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(threshold: LogLevel) -> (EventLog, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (EventLog::with_writer(threshold, Box::new(buffer.clone())), buffer)
    }

    #[test]
    fn test_below_threshold_is_recorded_but_not_printed() {
        let (log, out) = capture(LogLevel::Notice);
        log.log("quiet", Some(LogLevel::Debug), None);

        assert_eq!(log.len(), 1);
        assert!(out.contents().is_empty());
    }

    #[test]
    fn test_at_threshold_is_recorded_and_printed() {
        let (log, out) = capture(LogLevel::Notice);
        log.log("loud", Some(LogLevel::Notice), Some("Count"));
        log.log("louder", Some(LogLevel::Error), None);

        assert_eq!(log.len(), 2);
        let printed = out.contents();
        assert_eq!(printed.lines().count(), 2);
        assert!(printed.lines().next().unwrap().ends_with("[3] Count loud"));
    }

    #[test]
    fn test_level_defaults_to_info() {
        let (log, out) = capture(LogLevel::Info);
        log.log("hello", None, None);

        assert_eq!(log.records()[0].level, LogLevel::Info);
        assert!(out.contents().contains("[2]  hello"));
    }

    #[test]
    fn test_default_threshold_is_notice() {
        assert_eq!(LogLevel::default(), LogLevel::Notice);
        assert_eq!(LogLevel::default().as_u8(), 3);
    }

    #[test]
    fn test_timestamp_format() {
        let (log, _) = capture(LogLevel::Error);
        log.log("x", None, None);

        let stamp = log.records()[0].timestamp();
        let parts: Vec<&str> = stamp.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 6);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_threshold_can_change() {
        let (log, out) = capture(LogLevel::Error);
        log.log("hidden", Some(LogLevel::Warning), None);
        log.set_threshold(LogLevel::Warning);
        log.log("shown", Some(LogLevel::Warning), None);

        assert_eq!(log.len(), 2);
        assert!(!out.contents().contains("hidden"));
        assert!(out.contents().contains("shown"));
    }

    #[test]
    fn test_probe_log_tags_events() {
        let (log, _) = capture(LogLevel::Error);
        log.for_probe("Checksum").log("fetching", Some(LogLevel::Debug));

        assert_eq!(log.records()[0].probe.as_deref(), Some("Checksum"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("notice".parse::<LogLevel>().unwrap(), LogLevel::Notice);
        assert_eq!("4".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("9".parse::<LogLevel>().is_err());
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
