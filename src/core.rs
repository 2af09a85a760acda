use crate::{
    app::AppState,
    auth::JwtIdentityResolver,
    config::Config,
    cors::build_cors_layer,
    error::{RelayError, Result},
    health,
    relay::ws_handler,
    store::JsonlMessageStore,
};
use axum::{Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// The relay server: routes, middleware and the listening loop
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build a server with the JWT resolver and JSON Lines store described
    /// by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let resolver = JwtIdentityResolver::from_config(&config.auth)?;
        let store = JsonlMessageStore::new(&config.persistence.store_path);
        Ok(Self::new(AppState::new(
            config,
            Arc::new(resolver),
            Arc::new(store),
        )))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Assemble the router
    ///
    /// Layers (outer to inner): trace, CORS.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health::health_handler))
            .with_state(self.state.clone());

        if let Some(cors_layer) = build_cors_layer(&self.state.config.cors) {
            router = router.layer(cors_layer);
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM
    pub async fn serve(self) -> Result<()> {
        let addr = self
            .state
            .config
            .server
            .addr()
            .map_err(|e| RelayError::bad_request(format!("Invalid server address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::internal(format!("Failed to bind {}: {}", addr, e)))?;

        self.serve_with_listener(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Relay listening on ws://{}/ws", addr);
            tracing::info!("Health check available at http://{}/health", addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RelayError::internal(format!("Server error: {}", e)))
    }
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracing::info!("Shutdown complete");
}
