//! Test fixtures: users, tokens, resolvers, stores and connections

use crate::app::AppState;
use crate::auth::{Identity, IdentityResolver, RelayClaims};
use crate::config::ConfigBuilder;
use crate::core::RelayServer;
use crate::error::{RelayError, Result};
use crate::relay::{ChatMessage, Connection, Message};
use crate::store::{InMemoryMessageStore, MessageStore};
use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    pub fn email() -> String {
        format!("test-{}@example.com", Uuid::new_v4().simple())
    }

    pub fn uuid() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn room_id() -> String {
        format!("room-{}", &Uuid::new_v4().simple().to_string()[..8])
    }
}

/// A user to mint tokens for
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub image_url: Option<String>,
}

impl TestUser {
    /// A user with generated id and email
    pub fn generate() -> Self {
        Self {
            id: fake::uuid(),
            email: fake::email(),
            image_url: None,
        }
    }

    pub fn named(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// The identity the relay resolves for this user
    pub fn identity(&self) -> Identity {
        let identity = Identity::new(&self.id, &self.email).with_email(&self.email);
        match &self.image_url {
            Some(url) => identity.with_avatar(url),
            None => identity,
        }
    }
}

/// Mints HS256 tokens the way the issuing service does
#[derive(Clone)]
pub struct TestTokens {
    secret: String,
}

impl TestTokens {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// A token valid for one hour
    pub fn mint(&self, user: &TestUser) -> String {
        self.mint_with_expiry(user, chrono::Duration::hours(1))
    }

    /// A token that expired an hour ago
    pub fn expired(&self, user: &TestUser) -> String {
        self.mint_with_expiry(user, chrono::Duration::hours(-1))
    }

    fn mint_with_expiry(&self, user: &TestUser, offset: chrono::Duration) -> String {
        let claims = RelayClaims {
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: None,
            image_url: user.image_url.clone(),
            exp: (chrono::Utc::now() + offset).timestamp() as usize,
            iss: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .unwrap()
    }
}

/// Resolver backed by a fixed token table
#[derive(Default)]
pub struct StaticResolver {
    identities: RwLock<HashMap<String, Identity>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: impl Into<String>, identity: Identity) -> Self {
        self.identities
            .write()
            .unwrap()
            .insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticResolver {
    async fn validate(&self, token: &str) -> Result<Identity> {
        self.identities
            .read()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| RelayError::unauthorized("Unknown token"))
    }
}

/// Store whose appends always fail
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn append(&self, _message: &ChatMessage) -> Result<()> {
        Err(RelayError::persistence("store unavailable"))
    }

    fn is_healthy(&self) -> bool {
        false
    }
}

/// State with test-friendly config, the given resolver and store
pub fn test_state(
    resolver: impl IdentityResolver,
    store: Arc<dyn MessageStore>,
) -> AppState {
    let config = ConfigBuilder::new()
        .with_jwt_secret("test-secret")
        .build()
        .unwrap();
    AppState::new(config, Arc::new(resolver), store)
}

/// Server with an in-memory store
pub fn test_server(resolver: impl IdentityResolver) -> RelayServer {
    RelayServer::new(test_state(resolver, Arc::new(InMemoryMessageStore::new())))
}

/// A connection whose outbound queue the test reads directly
pub struct TestConnection {
    pub conn: Arc<Connection>,
    pub rx: mpsc::Receiver<Message>,
}

impl TestConnection {
    /// Next queued frame decoded as JSON, waiting up to one second
    pub async fn next_event(&mut self) -> serde_json::Value {
        let msg = tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("outbound queue closed");
        let text = msg.as_text().expect("expected a text frame");
        serde_json::from_str(text).expect("frame is not JSON")
    }

    /// Next queued frame if one is already waiting
    pub fn try_next_event(&mut self) -> Option<serde_json::Value> {
        let msg = self.rx.try_recv().ok()?;
        msg.as_text().and_then(|text| serde_json::from_str(text).ok())
    }
}

/// Create a connection for `identity` with a queue of `capacity` frames
pub fn test_connection(identity: Identity, capacity: usize) -> TestConnection {
    let (tx, rx) = mpsc::channel(capacity);
    TestConnection {
        conn: Arc::new(Connection::new(identity, tx)),
        rx,
    }
}
