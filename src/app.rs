use crate::auth::IdentityResolver;
use crate::config::Config;
use crate::relay::{RoomRegistry, Session};
use crate::store::MessageStore;
use std::sync::Arc;

/// Shared state handed to every handler
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub session: Arc<Session>,
}

impl AppState {
    /// Wire a registry, session and resolver together from `config`
    pub fn new(
        config: Config,
        resolver: Arc<dyn IdentityResolver>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let registry = Arc::new(RoomRegistry::with_max_connections(
            config.websocket.max_connections,
        ));
        let session =
            Session::new(registry, store).with_persist_timeout(config.persistence.persist_timeout());

        Self {
            config: Arc::new(config),
            resolver,
            session: Arc::new(session),
        }
    }

    /// Builder pattern for constructing AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        self.session.registry()
    }
}

/// Builder for AppState with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppStateBuilder {
    config: Config,
    resolver: Option<Arc<dyn IdentityResolver>>,
    store: Option<Arc<dyn MessageStore>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            resolver: None,
            store: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the state
    ///
    /// Without an explicit resolver, tokens are verified as HMAC-signed JWTs using
    /// the configured secret. Without an explicit store, messages go to the
    /// configured JSON Lines file.
    ///
    /// # Errors
    /// `RelayError::Internal` when no resolver is given and the JWT secret
    /// is empty.
    pub fn build(self) -> crate::error::Result<AppState> {
        let resolver: Arc<dyn IdentityResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(crate::auth::JwtIdentityResolver::from_config(&self.config.auth)?),
        };
        let store: Arc<dyn MessageStore> = match self.store {
            Some(store) => store,
            None => Arc::new(crate::store::JsonlMessageStore::new(
                &self.config.persistence.store_path,
            )),
        };

        Ok(AppState::new(self.config, resolver, store))
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
