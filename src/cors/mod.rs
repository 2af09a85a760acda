//! Cross-origin policy for the relay.
//!
//! Browsers do not apply CORS to WebSocket handshakes, so the same allow-list
//! is enforced twice: as a `tower_http` CORS layer for plain HTTP routes, and
//! as an explicit `Origin` check before a socket is upgraded.

use axum::http::{HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::utils::get_env_with_prefix;

/// Cross-origin configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Whether origin checks and CORS headers are applied at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Allowed origins (e.g. `["https://chat.example.com"]`); `["*"]` allows any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum age for preflight request caching (in seconds)
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            allowed_origins: default_allowed_origins(),
            max_age_seconds: default_max_age(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

impl CorsConfig {
    /// Restrict to the given origins
    pub fn restrictive(allowed_origins: Vec<String>) -> Self {
        Self {
            enabled: true,
            allowed_origins,
            max_age_seconds: default_max_age(),
        }
    }

    /// Override from `RELAY_CORS_ENABLED` and `RELAY_CORS_ORIGINS`, touching
    /// only the fields whose variables are set
    pub fn apply_env(&mut self) {
        if let Some(enabled) = get_env_with_prefix("CORS_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(true);
        }

        if let Some(origins) = get_env_with_prefix("CORS_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Whether a handshake carrying this `Origin` header may be upgraded
    ///
    /// Requests without an `Origin` header come from non-browser clients and
    /// are always allowed.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if !self.enabled || self.allows_any() {
            return true;
        }
        match origin {
            None => true,
            Some(origin) => self.allowed_origins.iter().any(|o| o == origin),
        }
    }
}

/// Build the CORS layer for HTTP routes, or `None` when disabled
pub fn build_cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let mut layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age_seconds));

    if config.allows_any() {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer = layer.allow_origin(origins);
    }

    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_any_origin() {
        let config = CorsConfig::default();
        assert!(config.origin_allowed(Some("https://anywhere.example")));
        assert!(build_cors_layer(&config).is_some());
    }

    #[test]
    fn test_restrictive_origin_check() {
        let config = CorsConfig::restrictive(vec!["https://chat.example.com".to_string()]);
        assert!(config.origin_allowed(Some("https://chat.example.com")));
        assert!(!config.origin_allowed(Some("https://evil.example.com")));
        assert!(config.origin_allowed(None));
    }

    #[test]
    fn test_disabled_cors() {
        let config = CorsConfig {
            enabled: false,
            allowed_origins: vec!["https://chat.example.com".to_string()],
            ..Default::default()
        };
        assert!(build_cors_layer(&config).is_none());
        assert!(config.origin_allowed(Some("https://evil.example.com")));
    }
}
