//! OAuth 2.0 protocol front half: authorization requests, PKCE, client
//! authentication, and the token endpoint wire types.

pub mod authorize;
pub mod client_auth;
pub mod pkce;
pub mod service;
pub mod token;

pub use authorize::{AuthorizeError, AuthorizeErrorCode, AuthorizeRequest, AuthorizeResponse};
pub use client_auth::{
    AuthenticatedClient, TokenEndpointAuthMethod, authenticate_client, parse_basic_auth,
};
pub use pkce::{PkceChallenge, PkceError, PkceMethod, PkceVerifier};
pub use service::{AuthorizationConfig, AuthorizationService};
pub use token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
