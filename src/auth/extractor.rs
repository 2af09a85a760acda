use crate::app::AppState;
use crate::auth::{identity::Identity, token::TokenExtractor};
use crate::error::RelayError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Axum extractor resolving the caller's [`Identity`]
///
/// Runs before the WebSocket upgrade extractor, so a missing or invalid
/// credential is answered with 401 and no socket is ever opened.
pub struct Authenticated(pub Identity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = RelayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = &state.config.auth;
        let token = TokenExtractor::from_request(parts, &auth.cookie_name, &auth.query_param)?;

        let identity = state.resolver.validate(&token).await.map_err(|e| {
            tracing::warn!(error = %e, "Rejected connection with invalid credential");
            match e {
                RelayError::Unauthorized(_) => e,
                other => RelayError::unauthorized(format!("Credential check failed: {}", other)),
            }
        })?;

        Ok(Authenticated(identity))
    }
}
