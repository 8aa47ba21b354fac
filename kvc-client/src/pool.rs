//! # Connection Pool
//!
//! Purpose: Reuse TCP connections to the store so each operation skips the
//! connect/authenticate handshake.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Wait, Don't Fail**: At `max_active`, callers block on a condition
//!    variable until a connection is returned or a slot frees up.
//! 3. **Minimal Locking**: The mutex guards bookkeeping only; dialing and IO
//!    happen outside it.
//! 4. **Discard On Doubt**: A connection that saw an IO or framing error is
//!    dropped instead of returned.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kvc_common::{CacheOptions, Logger};
use parking_lot::{Condvar, Mutex};

use crate::error::{ClientError, ClientResult};
use crate::resp::{encode_command, read_reply, Reply};

/// Pool configuration derived from `CacheOptions`.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Store address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Password sent with `AUTH` after dialing.
    pub password: Option<String>,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum live connections (idle + in-use); 0 means unlimited.
    pub max_active: usize,
    /// Idle connections older than this are closed on the next acquire.
    pub idle_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl PoolConfig {
    /// Derives pool settings from validated client options.
    pub fn from_options(options: &CacheOptions) -> Self {
        PoolConfig {
            addr: options.address(),
            password: (!options.password.is_empty()).then(|| options.password.clone()),
            max_idle: options.max_idle,
            max_active: options.max_active,
            idle_timeout: options.idle_timeout(),
            read_timeout: options.read_timeout(),
            write_timeout: options.write_timeout(),
            connect_timeout: options.connect_timeout(),
        }
    }

    fn at_capacity(&self, live: usize) -> bool {
        self.max_active > 0 && live >= self.max_active
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections parked in the pool.
    pub idle: usize,
    /// All live connections, idle ones included.
    pub active: usize,
}

struct IdleConnection {
    conn: Connection,
    since: Instant,
}

struct PoolState {
    // Most recently returned connection sits at the front.
    idle: VecDeque<IdleConnection>,
    live: usize,
    closed: bool,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
    logger: Arc<dyn Logger>,
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates an empty pool. Connections are dialed lazily on first use.
    pub fn new(config: PoolConfig, logger: Arc<dyn Logger>) -> Self {
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            live: 0,
            closed: false,
        };
        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
                available: Condvar::new(),
                logger,
            }),
        }
    }

    /// Acquires a connection, blocking while the pool is exhausted.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        let mut state = self.inner.state.lock();
        loop {
            if state.closed {
                return Err(ClientError::PoolClosed);
            }
            self.evict_stale(&mut state);
            if let Some(idle) = state.idle.pop_front() {
                return Ok(PooledConnection::new(self.inner.clone(), idle.conn));
            }
            if !self.inner.config.at_capacity(state.live) {
                state.live += 1;
                break;
            }
            self.inner.available.wait(&mut state);
        }
        drop(state);

        match Connection::dial(&self.inner.config, self.inner.logger.as_ref()) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                release_slot(&self.inner);
                Err(err)
            }
        }
    }

    /// Closes idle connections and rejects further acquires.
    ///
    /// Connections currently in use are closed when their guard drops.
    pub fn close(&self) {
        let drained: Vec<IdleConnection> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.live = state.live.saturating_sub(drained.len());
            drained
        };
        self.inner.available.notify_all();
        drop(drained);
    }

    /// Snapshot of idle and live connection counts.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            idle: state.idle.len(),
            active: state.live,
        }
    }

    fn evict_stale(&self, state: &mut PoolState) {
        let Some(timeout) = self.inner.config.idle_timeout else {
            return;
        };
        // Oldest connections sit at the back.
        while state
            .idle
            .back()
            .map_or(false, |idle| idle.since.elapsed() >= timeout)
        {
            state.idle.pop_back();
            state.live = state.live.saturating_sub(1);
        }
    }
}

fn release_slot(inner: &PoolInner) {
    {
        let mut state = inner.state.lock();
        state.live = state.live.saturating_sub(1);
    }
    inner.available.notify_one();
}

fn return_connection(inner: &PoolInner, conn: Connection) {
    let surplus = {
        let mut state = inner.state.lock();
        if state.closed || state.idle.len() >= inner.config.max_idle {
            state.live = state.live.saturating_sub(1);
            Some(conn)
        } else {
            state.idle.push_front(IdleConnection {
                conn,
                since: Instant::now(),
            });
            None
        }
    };
    // Closing the socket happens outside the lock.
    drop(surplus);
    inner.available.notify_one();
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Sends one command and reads its reply.
    pub fn exec<A: AsRef<[u8]>>(&mut self, name: &[u8], args: &[A]) -> ClientResult<Reply> {
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(ClientError::protocol("connection already released")),
        };
        let response = conn.exec(name, args);
        if let Err(err) = &response {
            if err.breaks_connection() {
                // If IO/protocol fails, do not return this connection to the pool.
                self.valid = false;
            }
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        if self.valid {
            return_connection(&self.pool, conn);
        } else {
            drop(conn);
            release_slot(&self.pool);
        }
    }
}

/// Single TCP connection with reusable buffers.
pub struct Connection {
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    /// Opens a connection and authenticates it when a password is configured.
    fn dial(config: &PoolConfig, logger: &dyn Logger) -> ClientResult<Self> {
        let stream = match connect_stream(config) {
            Ok(stream) => stream,
            Err(err) => {
                logger.error("kvcache dial failed", &[("addr", &config.addr), ("error", &err)]);
                return Err(err);
            }
        };

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        };

        if let Some(password) = &config.password {
            if let Err(err) = conn.exec(b"AUTH", &[password.as_bytes()]) {
                logger.error("kvcache auth failed", &[("addr", &config.addr), ("error", &err)]);
                return Err(match err {
                    ClientError::Server(message) => ClientError::Auth(message),
                    other => other,
                });
            }
        }
        Ok(conn)
    }

    fn exec<A: AsRef<[u8]>>(&mut self, name: &[u8], args: &[A]) -> ClientResult<Reply> {
        self.write_buf.clear();
        encode_command(name, args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_reply(&mut self.reader, &mut self.line_buf)
    }
}

fn connect_stream(config: &PoolConfig) -> ClientResult<TcpStream> {
    let addrs: Vec<SocketAddr> = config.addr.to_socket_addrs()?.collect();
    let mut last_err = None;
    for addr in addrs {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_read_timeout(config.read_timeout)?;
                stream.set_write_timeout(config.write_timeout)?;
                // Disable Nagle to keep request latency low for small payloads.
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(match last_err {
        Some(err) => ClientError::Io(err),
        None => ClientError::protocol(format!("address `{}` resolved to nothing", config.addr)),
    })
}
