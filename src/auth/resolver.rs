use crate::auth::identity::Identity;
use crate::auth::jwt::JwtVerifier;
use crate::config::AuthConfig;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Turns a bearer credential into an [`Identity`]
///
/// Implement this trait to plug in any credential scheme. Every failure,
/// whether malformed, badly signed, or expired, must surface as
/// [`RelayError::Unauthorized`] so the upgrade is rejected with 401.
///
/// # Example
///
/// ```rust,ignore
/// use roomrelay::auth::{Identity, IdentityResolver};
/// use roomrelay::{RelayError, Result};
///
/// struct ApiKeyResolver;
///
/// #[async_trait::async_trait]
/// impl IdentityResolver for ApiKeyResolver {
///     async fn validate(&self, token: &str) -> Result<Identity> {
///         match token {
///             "k-123" => Ok(Identity::new("svc-1", "ingest bot")),
///             _ => Err(RelayError::unauthorized("Unknown API key")),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    async fn validate(&self, token: &str) -> Result<Identity>;
}

/// Claims carried by relay tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayClaims {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Resolves identities from HMAC-signed JWTs
///
/// The email doubles as the display name.
#[derive(Clone)]
pub struct JwtIdentityResolver {
    verifier: JwtVerifier<RelayClaims>,
}

impl JwtIdentityResolver {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            verifier: JwtVerifier::from_secret(secret),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(RelayError::internal("JWT secret is not configured"));
        }

        let mut resolver = Self::from_secret(config.jwt_secret.as_bytes());
        if let Some(issuer) = &config.issuer {
            resolver.verifier.set_issuer(issuer.clone());
        }
        Ok(resolver)
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn validate(&self, token: &str) -> Result<Identity> {
        let claims = self.verifier.verify(token)?.claims;

        if claims.user_id.is_empty() {
            return Err(RelayError::unauthorized("Token has no user_id claim"));
        }

        tracing::debug!(user_id = %claims.user_id, role = ?claims.role, "Token validated");

        Ok(Identity {
            id: claims.user_id,
            display_name: claims.email.clone(),
            email: claims.email,
            avatar_ref: claims.image_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &[u8], user_id: &str, exp_offset: chrono::Duration) -> String {
        let claims = RelayClaims {
            user_id: user_id.to_string(),
            email: "alice@example.com".to_string(),
            role: Some("member".to_string()),
            image_url: Some("https://cdn.example.com/alice.png".to_string()),
            exp: (chrono::Utc::now() + exp_offset).timestamp() as usize,
            iss: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_resolves_identity() {
        let resolver = JwtIdentityResolver::from_secret(b"secret");
        let identity = resolver
            .validate(&token(b"secret", "u-1", chrono::Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(identity.id, "u-1");
        assert_eq!(identity.display_name, "alice@example.com");
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.avatar_ref, "https://cdn.example.com/alice.png");
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let resolver = JwtIdentityResolver::from_secret(b"secret");
        let result = resolver
            .validate(&token(b"other", "u-1", chrono::Duration::hours(1)))
            .await;
        assert!(matches!(result, Err(RelayError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected() {
        let resolver = JwtIdentityResolver::from_secret(b"secret");
        let result = resolver.validate("not-a-jwt").await;
        assert!(matches!(result, Err(RelayError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_empty_user_id_rejected() {
        let resolver = JwtIdentityResolver::from_secret(b"secret");
        let result = resolver
            .validate(&token(b"secret", "", chrono::Duration::hours(1)))
            .await;
        assert!(matches!(result, Err(RelayError::Unauthorized(_))));
    }

    #[test]
    fn test_from_config_requires_secret() {
        assert!(JwtIdentityResolver::from_config(&AuthConfig::default()).is_err());
    }
}
