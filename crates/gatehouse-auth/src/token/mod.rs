//! Token issuance, verification, revocation, and introspection.

pub mod introspection;
pub mod jwt;
pub mod revocation;
pub mod service;

pub use introspection::{IntrospectionRequest, IntrospectionResponse};
pub use jwt::{AccessClaims, IdClaims, Jwk, Jwks, JwtError, JwtService, SigningKeyPair};
pub use revocation::{RevocationRequest, RevocationResponse, TokenTypeHint};
pub use service::{TokenConfig, TokenService, require_scopes};
