use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cors::CorsConfig;
use crate::error::{RelayError, Result};
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};

/// Main configuration for a relay server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

/// Credential lookup and JWT validation settings
#[derive(Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC shared secret used to verify tokens
    #[serde(default)]
    pub jwt_secret: String,
    /// Expected `iss` claim; not checked when unset
    #[serde(default)]
    pub issuer: Option<String>,
    /// Cookie holding the bearer token
    #[serde(default = "default_token_name")]
    pub cookie_name: String,
    /// Query parameter consulted when the cookie is absent
    #[serde(default = "default_token_name")]
    pub query_param: String,
}

// Keeps the secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("cookie_name", &self.cookie_name)
            .field("query_param", &self.query_param)
            .finish()
    }
}

/// Per-connection WebSocket settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSocketConfig {
    /// Interval between liveness pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// Read deadline, reset by every inbound frame
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Largest inbound message accepted, in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Outbound queue depth per connection
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Concurrent connection limit (0 = unlimited)
    #[serde(default)]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    /// File the JSON-lines store appends to
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Upper bound on a single append before it is abandoned
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: None,
            cookie_name: default_token_name(),
            query_param: default_token_name(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            read_timeout_secs: default_read_timeout(),
            max_frame_size: default_max_frame_size(),
            channel_capacity: default_channel_capacity(),
            max_connections: 0,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            persist_timeout_secs: default_persist_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_name() -> String {
    "token".to_string()
}

fn default_ping_interval() -> u64 {
    54
}

fn default_read_timeout() -> u64 {
    60
}

fn default_max_frame_size() -> usize {
    512
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_store_path() -> PathBuf {
    PathBuf::from("messages.jsonl")
}

fn default_persist_timeout() -> u64 {
    5
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl WebSocketConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl PersistenceConfig {
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_secs(self.persist_timeout_secs)
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.jwt_secret = secret.into();
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.auth.issuer = Some(issuer.into());
        self
    }

    pub fn with_websocket(mut self, websocket: WebSocketConfig) -> Self {
        self.config.websocket = websocket;
        self
    }

    pub fn with_ping_interval_secs(mut self, secs: u64) -> Self {
        self.config.websocket.ping_interval_secs = secs;
        self
    }

    pub fn with_read_timeout_secs(mut self, secs: u64) -> Self {
        self.config.websocket.read_timeout_secs = secs;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.websocket.channel_capacity = capacity;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.config.websocket.max_connections = max;
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.persistence.store_path = path.into();
        self
    }

    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.config.cors = cors;
        self
    }

    /// Load configuration from environment variables with RELAY_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = parse_env_with_prefix("PORT") {
            self.config.server.port = port;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        if let Some(secret) = get_env_with_prefix("JWT_SECRET") {
            self.config.auth.jwt_secret = secret;
        }
        if let Some(issuer) = get_env_with_prefix("JWT_ISSUER") {
            self.config.auth.issuer = Some(issuer);
        }
        if let Some(cookie) = get_env_with_prefix("TOKEN_COOKIE") {
            self.config.auth.cookie_name = cookie;
        }
        if let Some(param) = get_env_with_prefix("TOKEN_QUERY") {
            self.config.auth.query_param = param;
        }

        let ws = &mut self.config.websocket;
        if let Some(v) = parse_env_with_prefix("WS_PING_INTERVAL_SECS") {
            ws.ping_interval_secs = v;
        }
        if let Some(v) = parse_env_with_prefix("WS_READ_TIMEOUT_SECS") {
            ws.read_timeout_secs = v;
        }
        if let Some(v) = parse_env_with_prefix("WS_MAX_FRAME_SIZE") {
            ws.max_frame_size = v;
        }
        if let Some(v) = parse_env_with_prefix("WS_CHANNEL_CAPACITY") {
            ws.channel_capacity = v;
        }
        if let Some(v) = parse_env_with_prefix("WS_MAX_CONNECTIONS") {
            ws.max_connections = v;
        }

        if let Some(path) = get_env_with_prefix("STORE_PATH") {
            self.config.persistence.store_path = PathBuf::from(path);
        }
        if let Some(v) = parse_env_with_prefix("PERSIST_TIMEOUT_SECS") {
            self.config.persistence.persist_timeout_secs = v;
        }

        self.config.cors.apply_env();

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BadRequest` describing the first invalid setting.
    pub fn build(self) -> Result<Config> {
        let config = self.config;

        config.server.addr().map_err(|e| {
            RelayError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                config.server.host, config.server.port, e
            ))
        })?;

        if config.server.port == 0 {
            return Err(RelayError::bad_request("Server port must be greater than 0"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(RelayError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if config.auth.jwt_secret.is_empty() {
            return Err(RelayError::bad_request("JWT secret must be set"));
        }

        let ws = &config.websocket;
        if ws.ping_interval_secs == 0 || ws.read_timeout_secs == 0 {
            return Err(RelayError::bad_request(
                "WebSocket ping interval and read timeout must be greater than 0",
            ));
        }
        if ws.ping_interval_secs >= ws.read_timeout_secs {
            return Err(RelayError::bad_request(format!(
                "WebSocket ping interval ({}s) must be shorter than the read timeout ({}s)",
                ws.ping_interval_secs, ws.read_timeout_secs
            )));
        }
        if ws.max_frame_size == 0 {
            return Err(RelayError::bad_request("WebSocket max frame size must be greater than 0"));
        }
        if ws.channel_capacity == 0 {
            return Err(RelayError::bad_request("WebSocket channel capacity must be greater than 0"));
        }

        if config.persistence.persist_timeout_secs == 0 {
            return Err(RelayError::bad_request("Persist timeout must be greater than 0"));
        }

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
