//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::future::IntoFuture;
use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use crate::api;
use crate::core::{Config, Result, ServerState};
use crate::store::KvStore;

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl-C or SIGTERM, then drain and close the store
    pub async fn run(&self) -> Result<()> {
        let state = self.state.clone();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Order server listening on {}", addr);

        let shutdown = state.shutdown.clone();
        tokio::spawn(watch_signals(shutdown.clone()));

        let app = api::router(state.clone());
        let drain_timeout = self.config.shutdown_timeout();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .into_future();

        let served = tokio::select! {
            res = serve => res,
            _ = async {
                state.shutdown.cancelled().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                tracing::warn!(
                    timeout_ms = drain_timeout.as_millis() as u64,
                    "Graceful shutdown timed out, dropping open connections"
                );
                Ok(())
            }
        };

        state.shutdown.cancel();
        release_store(served, state.store.as_ref()).await
    }
}

/// Close the store whether or not serving ended cleanly, then report the
/// serve error first
async fn release_store(served: std::io::Result<()>, store: &dyn KvStore) -> Result<()> {
    let closed = store.close().await;
    served?;
    closed?;
    Ok(())
}

/// Cancel `shutdown` on the first termination signal
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("Shutting down...");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServerError;
    use crate::store::{RedbStore, StoreError};

    #[tokio::test]
    async fn test_serve_error_still_closes_store() {
        let store = RedbStore::open_in_memory().unwrap();
        let failed = Err(std::io::Error::other("accept loop died"));

        let err = release_store(failed, &store).await.unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn test_clean_stop_closes_store() {
        let store = RedbStore::open_in_memory().unwrap();

        release_store(Ok(()), &store).await.unwrap();
        assert!(matches!(store.get("order:1").await, Err(StoreError::Closed)));
    }
}
