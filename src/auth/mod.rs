//! Identity resolution for incoming connections.
//!
//! A connection is admitted only after its bearer credential has been turned
//! into an [`Identity`] by an [`IdentityResolver`]. The bundled resolver
//! verifies HMAC-signed JWTs; anything else can be plugged in through the trait.

pub mod extractor;
pub mod identity;
pub mod jwt;
pub mod resolver;
pub mod token;

pub use extractor::Authenticated;
pub use identity::Identity;
pub use jwt::JwtVerifier;
pub use resolver::{IdentityResolver, JwtIdentityResolver, RelayClaims};
pub use token::TokenExtractor;
