//! # Logging
//!
//! Purpose: Give cache components a small leveled logger that carries
//! key/value context, backed by `tracing`.
//!
//! ## Design Principles
//! 1. **Narrow Interface**: Components depend on the `Logger` trait only.
//! 2. **Owned Registry**: Named loggers live in a `LoggerRegistry` value created
//!    at startup and passed where needed, never in process-global state.
//! 3. **First Options Win**: Re-requesting a name returns the existing logger.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

/// Target used for every event emitted by [`TracingLogger`].
pub const LOG_TARGET: &str = "kvcache";

/// One key/value pair of log context.
pub type Field<'a> = (&'a str, &'a dyn fmt::Display);

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}

/// Output encoding chosen for the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "console" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

/// Leveled logger accepting a message plus key/value context.
pub trait Logger: Send + Sync {
    /// Returns true when records at `level` would be emitted.
    fn enabled(&self, level: Level) -> bool;

    /// Emits one record.
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]);

    fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Error, message, fields);
    }

    /// Records an unrecoverable condition. Never terminates the process.
    fn fatal(&self, message: &str, fields: &[Field<'_>]) {
        self.log(Level::Fatal, message, fields);
    }
}

/// Options applied when a named logger is first created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// Minimum level emitted by the logger.
    pub level: Level,
    /// Encoding used by binaries when they install a subscriber.
    pub format: LogFormat,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions {
            level: Level::Debug,
            format: LogFormat::Text,
        }
    }
}

/// `Logger` that forwards records to the `tracing` dispatcher.
#[derive(Debug)]
pub struct TracingLogger {
    name: String,
    level: Level,
}

impl TracingLogger {
    pub fn new(name: impl Into<String>, options: &LogOptions) -> Self {
        TracingLogger {
            name: name.into(),
            level: options.level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl Logger for TracingLogger {
    fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        if !self.enabled(level) {
            return;
        }
        let context = render_fields(fields);
        let logger = self.name.as_str();
        match level {
            Level::Debug => tracing::debug!(target: LOG_TARGET, logger, context = %context, "{}", message),
            Level::Info => tracing::info!(target: LOG_TARGET, logger, context = %context, "{}", message),
            Level::Warn => tracing::warn!(target: LOG_TARGET, logger, context = %context, "{}", message),
            Level::Error => tracing::error!(target: LOG_TARGET, logger, context = %context, "{}", message),
            Level::Fatal => {
                tracing::error!(target: LOG_TARGET, logger, fatal = true, context = %context, "{}", message)
            }
        }
    }
}

/// Renders key/value context as `key=value` pairs separated by spaces.
pub fn render_fields(fields: &[Field<'_>]) -> String {
    let mut out = String::new();
    for (idx, (key, value)) in fields.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&value.to_string());
    }
    out
}

/// Registry of named loggers owned by the application.
#[derive(Default)]
pub struct LoggerRegistry {
    loggers: Mutex<HashMap<String, Arc<TracingLogger>>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the logger registered under `name`, creating it with `options`
    /// when absent. Options of an existing logger are left untouched.
    pub fn get_or_create(&self, name: &str, options: &LogOptions) -> Arc<TracingLogger> {
        let mut loggers = self.loggers.lock();
        loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TracingLogger::new(name, options)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<TracingLogger>> {
        self.loggers.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.lock().is_empty()
    }

    /// Drops every registered logger. Handles already given out stay usable.
    pub fn teardown(&self) {
        self.loggers.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_controls_enabled() {
        let logger = TracingLogger::new("cache", &LogOptions { level: Level::Warn, ..LogOptions::default() });
        assert!(!logger.enabled(Level::Debug));
        assert!(!logger.enabled(Level::Info));
        assert!(logger.enabled(Level::Warn));
        assert!(logger.enabled(Level::Fatal));
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("INFO".parse::<Level>(), Ok(Level::Info));
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert!("verbose".parse::<Level>().is_err());
        assert_eq!(Level::Fatal.to_string(), "fatal");
    }

    #[test]
    fn parses_log_formats() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("console".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default().to_string(), "text");
    }

    #[test]
    fn log_options_decode_with_defaults() {
        let options: LogOptions = serde_json::from_str(r#"{"format":"json"}"#).expect("decode");
        assert_eq!(options.format, LogFormat::Json);
        assert_eq!(options.level, Level::Debug);
        let options: LogOptions = serde_json::from_str(r#"{"level":"warn"}"#).expect("decode");
        assert_eq!(options, LogOptions { level: Level::Warn, ..LogOptions::default() });
    }

    #[test]
    fn renders_context_pairs() {
        let key = "user:1";
        let ttl = 30;
        let rendered = render_fields(&[("key", &key), ("ttl", &ttl)]);
        assert_eq!(rendered, "key=user:1 ttl=30");
        assert_eq!(render_fields(&[]), "");
    }

    #[test]
    fn registry_returns_same_logger_per_name() {
        let registry = LoggerRegistry::new();
        let first = registry.get_or_create("cache", &LogOptions { level: Level::Error, ..LogOptions::default() });
        let second = registry.get_or_create("cache", &LogOptions::default());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.level(), Level::Error);

        registry.get_or_create("db", &LogOptions::default());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("db").map(|l| l.name().to_string()), Some("db".to_string()));
    }

    #[test]
    fn teardown_clears_registry() {
        let registry = LoggerRegistry::new();
        let logger = registry.get_or_create("cache", &LogOptions::default());
        registry.teardown();
        assert!(registry.is_empty());
        assert!(registry.get("cache").is_none());
        // Handles given out before teardown keep working.
        logger.info("still alive", &[]);
    }
}
