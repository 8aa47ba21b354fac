//! # Cache Options
//!
//! Purpose: Describe how the cache client reaches the store and how large its
//! connection pool may grow.
//!
//! ## Design Principles
//! 1. **Flat Structure**: One struct, no nesting, easy to embed in a larger config.
//! 2. **Typed Validation**: Bad values become `OptionsError`, never a panic.
//! 3. **Serde Friendly**: Every field has a default so partial documents load.

use std::env;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable prefix used by [`CacheOptions::from_env`].
pub const ENV_PREFIX: &str = "KVCACHE_";

/// Result type for option loading and validation.
pub type OptionsResult<T> = Result<T, OptionsError>;

/// Errors raised while loading or validating options.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// A field holds a value the client cannot work with.
    #[error("invalid option `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    /// The JSON document could not be decoded.
    #[error("malformed options document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection and pool settings for the cache client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Store host name or IP address.
    pub host: String,
    /// Store port, kept as text to match how it usually arrives from config.
    pub port: String,
    /// Password sent with `AUTH` after dialing; empty disables auth.
    pub password: String,
    /// Idle connections older than this are evicted; 0 keeps them forever.
    pub idle_timeout_secs: u64,
    /// Maximum idle connections retained by the pool.
    pub max_idle: usize,
    /// Maximum live connections (idle + in use); 0 means unlimited.
    pub max_active: usize,
    /// Optional TCP connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Optional TCP read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Optional TCP write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            host: "127.0.0.1".to_string(),
            port: "6379".to_string(),
            password: String::new(),
            idle_timeout_secs: 240,
            max_idle: 8,
            max_active: 16,
            connect_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
        }
    }
}

impl CacheOptions {
    /// Decodes options from a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> OptionsResult<Self> {
        let options: CacheOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Builds options from `KVCACHE_*` environment variables.
    ///
    /// # Environment Variables
    /// - `KVCACHE_HOST`, `KVCACHE_PORT`, `KVCACHE_PASSWORD`
    /// - `KVCACHE_IDLE_TIMEOUT` (seconds)
    /// - `KVCACHE_MAX_IDLE`, `KVCACHE_MAX_ACTIVE`
    ///
    /// Unset variables keep their default; unparsable numbers are errors.
    pub fn from_env() -> OptionsResult<Self> {
        let mut options = CacheOptions::default();
        if let Some(host) = env_var("HOST") {
            options.host = host;
        }
        if let Some(port) = env_var("PORT") {
            options.port = port;
        }
        if let Some(password) = env_var("PASSWORD") {
            options.password = password;
        }
        if let Some(value) = env_var("IDLE_TIMEOUT") {
            options.idle_timeout_secs = parse_number("idle_timeout_secs", &value)?;
        }
        if let Some(value) = env_var("MAX_IDLE") {
            options.max_idle = parse_number("max_idle", &value)?;
        }
        if let Some(value) = env_var("MAX_ACTIVE") {
            options.max_active = parse_number("max_active", &value)?;
        }
        options.validate()?;
        Ok(options)
    }

    /// Checks that the options describe a usable pool.
    pub fn validate(&self) -> OptionsResult<()> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        match self.port.parse::<u16>() {
            Ok(0) => return Err(invalid("port", "must be non-zero")),
            Ok(_) => {}
            Err(_) => return Err(invalid("port", format!("`{}` is not a port number", self.port))),
        }
        if self.max_active > 0 && self.max_idle > self.max_active {
            return Err(invalid(
                "max_idle",
                format!("{} exceeds max_active {}", self.max_idle, self.max_active),
            ));
        }
        Ok(())
    }

    /// Returns the `host:port` dial address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle eviction threshold, `None` when eviction is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> OptionsResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(field, format!("`{}` is not a number", value)))
}

fn invalid(field: &'static str, reason: impl Into<String>) -> OptionsError {
    OptionsError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = CacheOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.address(), "127.0.0.1:6379");
        assert_eq!(options.idle_timeout(), Some(Duration::from_secs(240)));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let options = CacheOptions::from_json(r#"{"host":"cache.local","port":"7000"}"#)
            .expect("options");
        assert_eq!(options.address(), "cache.local:7000");
        assert_eq!(options.max_idle, 8);
        assert!(options.password.is_empty());
        assert_eq!(options.read_timeout(), None);
    }

    #[test]
    fn rejects_bad_port() {
        let err = CacheOptions::from_json(r#"{"port":"redis"}"#).unwrap_err();
        assert!(matches!(err, OptionsError::Invalid { field: "port", .. }));

        let options = CacheOptions {
            port: "0".to_string(),
            ..CacheOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn rejects_idle_above_active() {
        let options = CacheOptions {
            max_idle: 10,
            max_active: 2,
            ..CacheOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert!(matches!(err, OptionsError::Invalid { field: "max_idle", .. }));

        let unlimited = CacheOptions {
            max_idle: 10,
            max_active: 0,
            ..CacheOptions::default()
        };
        assert!(unlimited.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = CacheOptions::from_json("{not json").unwrap_err();
        assert!(matches!(err, OptionsError::Parse(_)));
    }

    #[test]
    fn zero_idle_timeout_disables_eviction() {
        let options = CacheOptions {
            idle_timeout_secs: 0,
            ..CacheOptions::default()
        };
        assert_eq!(options.idle_timeout(), None);
    }
}
