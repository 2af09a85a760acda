//! roomrelay - a real-time room relay
//!
//! Clients open an authenticated WebSocket, join named rooms and exchange
//! text messages. Each message is recorded by a persistence sink and fanned
//! out to every member of its room.
//!
//! # Features
//!
//! - **Rooms**: in-memory registry of room memberships, swept on disconnect
//! - **Authentication**: HMAC-signed JWT from a cookie or query parameter, or any
//!   custom [`auth::IdentityResolver`]
//! - **Persistence**: append-only [`store::MessageStore`] (JSON Lines file or
//!   in-memory)
//! - **Liveness**: keepalive pings and a read deadline per connection
//! - **Health**: `/health` with relay metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use roomrelay::{ConfigBuilder, RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     roomrelay::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     RelayServer::from_config(config)?.serve().await?;
//!     Ok(())
//! }
//! ```

mod app;
pub mod auth;
mod config;
mod core;
pub mod cors;
mod error;
pub mod health;
pub mod relay;
pub mod store;
pub mod testing;
mod utils;

pub use app::{AppState, AppStateBuilder};
pub use config::{
    AuthConfig, Config, ConfigBuilder, LoggingConfig, PersistenceConfig, ServerConfig,
    WebSocketConfig,
};
pub use crate::core::{RelayServer, shutdown_signal};
pub use cors::CorsConfig;
pub use error::{RelayError, Result};
pub use health::{HealthResponse, HealthStatus};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "roomrelay=debug")
/// - `RELAY_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    init_subscriber(env_filter, json_logs);
}

/// Initialize tracing from the logging section of `config`
///
/// `RUST_LOG`, when set, still takes precedence over the configured level.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    init_subscriber(env_filter, config.logging.json);
}

fn init_subscriber(env_filter: EnvFilter, json: bool) {
    // A subscriber may already be installed (tests, embedding); keep it.
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}
