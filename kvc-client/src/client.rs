//! # Cache Client API
//!
//! Purpose: Expose a compact, blocking API over the pooled connection, one
//! method per store command.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `CacheClient` hides pooling, framing and coercion.
//! 2. **Absent Is Not An Error**: Missing data comes back as empty values or
//!    sentinels inside `Ok`.
//! 3. **Validate Locally**: Malformed arguments fail before touching the pool.
//! 4. **Best-Effort TTL**: Expiration is a second command after the write, on
//!    the same connection. It is not atomic with the write; a failed `EXPIRE`
//!    is reported even though the write persisted.

use std::sync::Arc;

use kvc_common::{CacheOptions, Logger};

use crate::coerce::FromReply;
use crate::command::{execute, Command};
use crate::error::{ClientError, ClientResult};
use crate::pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};

/// Blocking cache client with connection pooling.
///
/// Cloning is cheap and clones share one pool. Each call acquires a
/// connection, runs its command (plus `EXPIRE` for TTL-bearing writes) and
/// returns the connection to the pool.
#[derive(Clone)]
pub struct CacheClient {
    pool: ConnectionPool,
    logger: Arc<dyn Logger>,
}

impl CacheClient {
    /// Creates a client from validated options. No connection is dialed yet.
    pub fn new(options: CacheOptions, logger: Arc<dyn Logger>) -> ClientResult<Self> {
        if let Err(err) = options.validate() {
            logger.error("kvcache options rejected", &[("error", &err)]);
            return Err(ClientError::InvalidConfig(err));
        }
        let pool = ConnectionPool::new(PoolConfig::from_options(&options), logger.clone());
        logger.info(
            "kvcache client initialized",
            &[
                ("addr", &options.address()),
                ("max_idle", &options.max_idle),
                ("max_active", &options.max_active),
            ],
        );
        Ok(CacheClient { pool, logger })
    }

    /// Sets a time-to-live in seconds. Returns true when the key existed.
    pub fn expire(&self, key: &str, ttl: i64) -> ClientResult<bool> {
        self.query(Command::new("EXPIRE").arg(key).arg(&ttl))
    }

    /// Pings the store and returns its answer, normally `PONG`.
    pub fn ping(&self) -> ClientResult<Vec<u8>> {
        self.query(Command::new("PING"))
    }

    /// Closes idle connections; later calls fail with `PoolClosed`.
    pub fn close(&self) {
        self.pool.close();
        self.logger.info("kvcache client closed", &[]);
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub(crate) fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub(crate) fn acquire(&self) -> ClientResult<PooledConnection> {
        self.pool.acquire()
    }

    /// Runs one command on a fresh pooled connection and coerces the reply.
    pub(crate) fn query<T: FromReply>(&self, command: Command) -> ClientResult<T> {
        let mut conn = self.pool.acquire()?;
        self.run(&mut conn, &command)
    }

    /// Runs one command on a connection the caller already holds.
    pub(crate) fn run<T: FromReply>(
        &self,
        conn: &mut PooledConnection,
        command: &Command,
    ) -> ClientResult<T> {
        let reply = execute(self.logger.as_ref(), conn, command)?;
        T::from_reply(reply).map_err(|err| {
            self.logger.error(
                "kvcache unexpected reply",
                &[("command", &command.name()), ("key", &command.key()), ("error", &err)],
            );
            err
        })
    }

    /// Runs a write, then applies `ttl` to `key` on the same connection.
    pub(crate) fn write_with_ttl(&self, command: Command, key: &str, ttl: i64) -> ClientResult<()> {
        let mut conn = self.pool.acquire()?;
        self.run::<()>(&mut conn, &command)?;
        self.apply_ttl(&mut conn, key, ttl)
    }

    /// Issues `EXPIRE key ttl` when `ttl > 0`; a no-op otherwise.
    pub(crate) fn apply_ttl(&self, conn: &mut PooledConnection, key: &str, ttl: i64) -> ClientResult<()> {
        if ttl <= 0 {
            return Ok(());
        }
        self.run::<()>(conn, &Command::new("EXPIRE").arg(key).arg(&ttl))
    }
}

/// Rejects an empty member/field/value list for `op`.
pub(crate) fn require_some<T>(op: &str, items: &[T]) -> ClientResult<()> {
    if items.is_empty() {
        return Err(ClientError::Validation(format!("{} needs at least one argument", op)));
    }
    Ok(())
}

/// Rejects argument lists that are empty or not made of whole pairs.
pub(crate) fn require_pairs<T>(op: &str, items: &[T]) -> ClientResult<()> {
    require_some(op, items)?;
    if items.len() % 2 != 0 {
        return Err(ClientError::Validation(format!(
            "{} arguments must come in pairs, got {}",
            op,
            items.len()
        )));
    }
    Ok(())
}
