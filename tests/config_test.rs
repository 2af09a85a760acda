use roomrelay::{Config, ConfigBuilder, CorsConfig, RelayError};
use std::time::Duration;

#[test]
fn test_from_env_reads_prefixed_and_fallback_variables() {
    // Single test touching the environment so nothing races on it
    unsafe {
        std::env::set_var("RELAY_HOST", "127.0.0.1");
        std::env::set_var("PORT", "7007");
        std::env::set_var("JWT_SECRET", "from-env");
        std::env::set_var("RELAY_WS_PING_INTERVAL_SECS", "20");
        std::env::set_var("RELAY_WS_READ_TIMEOUT_SECS", "30");
        std::env::set_var("RELAY_WS_MAX_CONNECTIONS", "250");
        std::env::set_var("RELAY_STORE_PATH", "/tmp/relay/messages.jsonl");
        std::env::set_var("RELAY_CORS_ORIGINS", "https://a.example.com, https://b.example.com");
    }

    let config = ConfigBuilder::new().from_env().build().unwrap();

    for var in [
        "RELAY_HOST",
        "PORT",
        "JWT_SECRET",
        "RELAY_WS_PING_INTERVAL_SECS",
        "RELAY_WS_READ_TIMEOUT_SECS",
        "RELAY_WS_MAX_CONNECTIONS",
        "RELAY_STORE_PATH",
        "RELAY_CORS_ORIGINS",
    ] {
        unsafe {
            std::env::remove_var(var);
        }
    }

    assert_eq!(config.server.addr().unwrap().to_string(), "127.0.0.1:7007");
    assert_eq!(config.auth.jwt_secret, "from-env");
    assert_eq!(config.websocket.ping_interval(), Duration::from_secs(20));
    assert_eq!(config.websocket.read_timeout(), Duration::from_secs(30));
    assert_eq!(config.websocket.max_connections, 250);
    assert_eq!(
        config.persistence.store_path.to_str(),
        Some("/tmp/relay/messages.jsonl")
    );
    assert_eq!(
        config.cors.allowed_origins,
        vec!["https://a.example.com", "https://b.example.com"]
    );

    // With no CORS variables set, an explicit policy survives from_env
    let config = ConfigBuilder::new()
        .with_jwt_secret("s")
        .with_cors(CorsConfig::restrictive(vec!["https://chat.example.com".to_string()]))
        .from_env()
        .build()
        .unwrap();
    assert_eq!(config.cors.allowed_origins, vec!["https://chat.example.com"]);
    assert!(!config.cors.origin_allowed(Some("https://evil.example.com")));
}

#[test]
fn test_partial_json_config_fills_defaults() {
    let config: Config = serde_json::from_str(
        r#"{ "server": { "port": 9000 }, "auth": { "jwt_secret": "s" } }"#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.websocket.ping_interval_secs, 54);
    assert_eq!(config.websocket.channel_capacity, 1000);
    assert_eq!(config.persistence.persist_timeout(), Duration::from_secs(5));
}

#[test]
fn test_invalid_settings_are_bad_requests() {
    let cases = [
        ConfigBuilder::new(),
        ConfigBuilder::new().with_jwt_secret("s").with_port(0),
        ConfigBuilder::new().with_jwt_secret("s").with_host("not a host"),
        ConfigBuilder::new().with_jwt_secret("s").with_read_timeout_secs(10),
    ];

    for builder in cases {
        assert!(matches!(builder.build(), Err(RelayError::BadRequest(_))));
    }
}
