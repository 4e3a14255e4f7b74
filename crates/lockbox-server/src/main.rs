//! Lockbox server entry point.
//!
//! Opens the storage backend, builds the vault engine, and serves the HTTP
//! API with graceful shutdown. A background worker sweeps expired tokens
//! and is stopped on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use lockbox_core::Vault;
use lockbox_storage::{MemoryBackend, StorageBackend};

use lockbox_server::config::{ServerConfig, StorageBackendType};
use lockbox_server::hardening;
use lockbox_server::routes;
use lockbox_server::shutdown::shutdown_signal;
use lockbox_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    // Before the master key can exist in this process.
    hardening::apply(&config);

    info!(storage = ?config.storage_backend, "Lockbox starting");

    let storage = open_storage(&config)?;
    let vault = Arc::new(
        Vault::open(storage)
            .await
            .context("failed to open vault over storage backend")?,
    );
    let state = Arc::new(AppState::new(Arc::clone(&vault)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep_handle = (config.token_sweep_interval_secs > 0).then(|| {
        let vault = Arc::clone(&vault);
        let mut rx = shutdown_rx.clone();
        let interval_secs = config.token_sweep_interval_secs;
        tokio::spawn(async move {
            token_sweep_worker(&vault, &mut rx, interval_secs).await;
        })
    });

    let app = routes::router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Lockbox server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    if let Some(handle) = sweep_handle {
        info!("waiting for token sweep worker to stop");
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            warn!("token sweep worker did not stop in time");
        }
    }

    info!("Lockbox server stopped");
    Ok(())
}

/// Open the configured storage backend.
fn open_storage(config: &ServerConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match &config.storage_backend {
        StorageBackendType::Memory => {
            warn!("using in-memory storage (data will not persist)");
            Ok(Arc::new(MemoryBackend::new()))
        }
        #[cfg(feature = "redb-backend")]
        StorageBackendType::Redb { path } => {
            info!(path = %path.display(), "using redb storage");
            Ok(Arc::new(
                lockbox_storage::RedbBackend::open(path).context("failed to open redb storage")?,
            ))
        }
        #[cfg(not(feature = "redb-backend"))]
        StorageBackendType::Redb { .. } => {
            anyhow::bail!("redb storage requested but the redb-backend feature is disabled")
        }
    }
}

/// Periodically evicts expired tokens until shutdown.
async fn token_sweep_worker(vault: &Vault, shutdown: &mut watch::Receiver<bool>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    info!(interval_secs, "token sweep worker started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = vault.purge_expired_tokens().await;
                if removed > 0 {
                    info!(removed, "expired tokens swept");
                }
            }
            _ = shutdown.changed() => {
                info!("token sweep worker shutting down");
                return;
            }
        }
    }
}
