//! Server configuration loaded from environment variables.

use std::env;
use std::sync::Arc;

use kvc_common::LogFormat;

/// Variable holding the listen address.
pub const BIND_VAR: &str = "KVCACHE_SERVER_BIND";
/// Variable holding the optional `requirepass` password.
pub const PASSWORD_VAR: &str = "KVCACHE_SERVER_PASSWORD";
/// Variable selecting `text` or `json` log output.
pub const LOG_FORMAT_VAR: &str = "KVCACHE_LOG_FORMAT";

/// Listen address and optional password for the reference server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port`; port 0 picks a free port.
    pub bind: String,
    /// When set, clients must `AUTH` before any other command.
    pub password: Option<String>,
    /// Encoding of the binary's log output.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:6379".to_string(),
            password: None,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Reads `KVCACHE_SERVER_BIND`, `KVCACHE_SERVER_PASSWORD` and
    /// `KVCACHE_LOG_FORMAT`.
    ///
    /// Unset, empty or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env::var(BIND_VAR)
                .ok()
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.bind),
            password: env::var(PASSWORD_VAR).ok().filter(|value| !value.is_empty()),
            log_format: env::var(LOG_FORMAT_VAR)
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.log_format),
        }
    }

    /// Ephemeral loopback configuration used by tests.
    pub fn ephemeral(password: Option<&str>) -> Self {
        Self {
            bind: "127.0.0.1:0".to_string(),
            password: password.map(str::to_string),
            ..Self::default()
        }
    }

    pub(crate) fn shared_password(&self) -> Option<Arc<str>> {
        self.password.as_deref().map(Arc::from)
    }
}
