//! Graceful shutdown on SIGINT or SIGTERM.

use std::future::Future;
use std::io;

use tokio::sync::watch;
use tracing::{info, warn};

/// Wait for SIGINT or SIGTERM, then notify background workers.
pub async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = wait_for("Ctrl+C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = wait_for("SIGTERM", async {
        let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        sig.recv().await;
        Ok(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}

/// Resolve when `signal` fires. A listener that cannot be installed never
/// resolves, so it cannot stop the server by itself.
pub async fn wait_for<F>(name: &str, signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(signal = name, error = %e, "failed to install signal listener");
        std::future::pending::<()>().await;
    }
}
