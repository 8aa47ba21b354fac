// kvc-common - Shared configuration and logging for the KVCache workspace
//
// Options describe how the client reaches the store; the logger interface is
// the only way cache components report failures.

pub mod log;
pub mod options;

// Re-export for convenience
pub use log::{Field, Level, LogFormat, LogOptions, Logger, LoggerRegistry, TracingLogger};
pub use options::{CacheOptions, OptionsError, OptionsResult};
