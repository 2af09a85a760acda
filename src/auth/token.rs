use crate::error::RelayError;
use axum::http::request::Parts;

/// Extracts the bearer credential from an upgrade request
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract a token, trying the cookie first, then the query parameter,
    /// then an `Authorization: Bearer` header
    pub fn from_request(
        parts: &Parts,
        cookie_name: &str,
        query_param: &str,
    ) -> Result<String, RelayError> {
        Self::from_cookie(parts, cookie_name)
            .or_else(|_| Self::from_query(parts, query_param))
            .or_else(|_| Self::from_header(parts))
            .map_err(|_| RelayError::unauthorized("Missing or invalid token"))
    }

    /// Extract token from Authorization header
    pub fn from_header(parts: &Parts) -> Result<String, RelayError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RelayError::unauthorized("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            RelayError::unauthorized(
                "Invalid authorization header format. Expected: Bearer <token>",
            )
        })?;

        if token.is_empty() {
            return Err(RelayError::unauthorized("Empty bearer token"));
        }

        Ok(token.to_string())
    }

    /// Extract token from a cookie
    pub fn from_cookie(parts: &Parts, cookie_name: &str) -> Result<String, RelayError> {
        let cookie_header = parts
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| RelayError::unauthorized("Missing cookie header"))?;

        let prefix = format!("{}=", cookie_name);
        for cookie in cookie_header.split(';') {
            if let Some(value) = cookie.trim().strip_prefix(&prefix) {
                if !value.is_empty() {
                    return Ok(value.to_string());
                }
            }
        }

        Err(RelayError::unauthorized(format!(
            "Cookie '{}' not found",
            cookie_name
        )))
    }

    /// Extract token from query parameter (browsers cannot set headers on WebSocket upgrades)
    ///
    /// A leading `Bearer ` on the decoded value is stripped.
    pub fn from_query(parts: &Parts, param_name: &str) -> Result<String, RelayError> {
        let query = parts
            .uri
            .query()
            .ok_or_else(|| RelayError::unauthorized("No query parameters"))?;

        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                if key == param_name && !value.is_empty() {
                    let decoded = urlencoding::decode(value).map_err(|_| {
                        RelayError::unauthorized("Query token is not valid UTF-8")
                    })?;
                    let token = decoded.strip_prefix("Bearer ").unwrap_or(&decoded);
                    if token.is_empty() {
                        return Err(RelayError::unauthorized("Empty query token"));
                    }
                    return Ok(token.to_string());
                }
            }
        }

        Err(RelayError::unauthorized(format!(
            "Query parameter '{}' not found",
            param_name
        )))
    }
}
