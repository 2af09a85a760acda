/// Get environment variable with RELAY_ prefix, falling back to unprefixed version
///
/// Checks `RELAY_{key}` first, then `{key}`, so deployments can use either
/// `RELAY_PORT` or the platform-provided `PORT`.
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("RELAY_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a prefixed environment variable, ignoring values that fail to parse
pub fn parse_env_with_prefix<T: std::str::FromStr>(key: &str) -> Option<T> {
    get_env_with_prefix(key).and_then(|v| v.trim().parse().ok())
}
