//! # KVCache Client
//!
//! Purpose: Provide a synchronous, typed client for a Redis-compatible store
//! with connection pooling and optional per-key expirations.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections; wait when exhausted.
//! 2. **Typed Replies**: Every reply is a `Reply` variant coerced through
//!    `FromReply`, so no call site inspects raw wire shapes.
//! 3. **Absent Is Data**: Missing keys are empty values or `-1` sentinels.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kvc_client::CacheClient;
//! use kvc_common::{CacheOptions, LogOptions, LoggerRegistry};
//!
//! let registry = LoggerRegistry::new();
//! let logger = registry.get_or_create("cache", &LogOptions::default());
//! let client = CacheClient::new(CacheOptions::from_env()?, logger)?;
//! client.set("session:1", b"payload", 300)?;
//! assert_eq!(client.get("session:1")?, b"payload");
//! ```

mod client;
mod coerce;
mod command;
mod error;
mod ops;
mod pool;
mod resp;

pub use client::CacheClient;
pub use coerce::{FromReply, Present, RANK_MISSING};
pub use command::{Command, ToArg};
pub use error::{ClientError, ClientResult};
pub use ops::ScoreBound;
pub use pool::{PoolConfig, PoolStats};
pub use resp::Reply;
