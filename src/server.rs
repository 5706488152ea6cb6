//! Listener setup and the serve loop.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::router::create_router;
use crate::api::state::{AppState, SharedState};
use crate::config::AppConfig;
use crate::error::RelayError;

/// Bind the listening socket. An address that is already in use (or not
/// permitted) is reported as [`RelayError::Bind`].
pub async fn bind(addr: &str) -> Result<TcpListener, RelayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve the relay on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> Result<(), RelayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(RelayError::Serve)
}

/// Bind `config.host:config.port` and relay until Ctrl-C / SIGTERM.
pub async fn start(config: AppConfig) -> Result<(), RelayError> {
    let bind_addr = config.bind_addr();
    let listener = bind(&bind_addr).await?;
    let state = AppState::new(config);

    info!(
        "relay-hub v{} listening on {bind_addr}",
        env!("CARGO_PKG_VERSION")
    );

    serve(listener, state, shutdown_signal()).await?;
    info!("relay-hub stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
