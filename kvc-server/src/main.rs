use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kvc_common::LogFormat;
use kvc_server::{server, ServerConfig, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    match config.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        auth = config.password.is_some(),
        "kvc-server listening"
    );

    let (shutdown, receiver) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown.send(true);
            }
            Err(err) => {
                // Keep the sender alive so the server runs until killed.
                warn!(error = %err, "ctrl-c handler unavailable");
                std::future::pending::<()>().await;
                drop(shutdown);
            }
        }
    });

    let password = config.password.as_deref().map(Arc::from);
    server::serve(listener, Arc::new(Store::new()), password, receiver)
        .await
        .context("server loop failed")?;
    Ok(())
}
