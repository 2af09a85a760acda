//! Testing utilities for the relay
//!
//! - Alba-style HTTP scenarios against a router without running a server
//! - Identity and token fixtures
//! - In-process connections with an inspectable outbound queue
//!
//! # Example
//!
//! ```rust,ignore
//! use roomrelay::testing::{self, StaticResolver, TestUser};
//!
//! #[tokio::test]
//! async fn test_upgrade_requires_credential() {
//!     let server = testing::test_server(StaticResolver::new());
//!
//!     testing::get(server.router(), "/ws")
//!         .websocket_upgrade()
//!         .execute()
//!         .await
//!         .assert_unauthorized();
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{
    FailingStore, StaticResolver, TestConnection, TestTokens, TestUser, fake, test_connection,
    test_server, test_state,
};
pub use scenario::{Scenario, ScenarioAssert, get};
