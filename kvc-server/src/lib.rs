//! # KVCache Reference Server
//!
//! Purpose: Serve a Redis-compatible subset of commands from memory so the
//! client can be exercised without an external store.
//!
//! ## Design Principles
//! 1. **Same Wire Format**: RESP2 in, RESP2 out, with the store's error codes
//!    (`WRONGTYPE`, `NOAUTH`, `WRONGPASS`).
//! 2. **Embeddable**: [`spawn`] runs the server on a background thread and
//!    hands back its bound address.
//! 3. **Async I/O**: One tokio task per connection.

pub mod config;
pub mod protocol;
pub mod server;
pub mod store;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::watch;

pub use config::ServerConfig;
pub use store::Store;

/// Running server started by [`spawn`]. Dropping it stops the server.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl ServerHandle {
    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections and waits for the server thread.
    pub fn shutdown(mut self) -> io::Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> io::Result<()> {
        let _ = self.shutdown.send(true);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "server thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(error = %err, "server stopped with error");
        }
    }
}

/// Binds `config.bind` and serves it from a background runtime.
pub fn spawn(config: ServerConfig) -> io::Result<ServerHandle> {
    let listener = std::net::TcpListener::bind(&config.bind)?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("kvc-server")
        .enable_all()
        .build()?;
    let password = config.shared_password();
    let (shutdown, receiver) = watch::channel(false);

    let thread = std::thread::Builder::new()
        .name("kvc-server-accept".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)?;
                server::serve(listener, Arc::new(Store::new()), password, receiver).await
            })
        })?;

    tracing::info!(%addr, "kvc-server listening");
    Ok(ServerHandle {
        addr,
        shutdown,
        thread: Some(thread),
    })
}
