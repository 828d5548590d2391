//! # gatehouse-auth
//!
//! OAuth 2.0 / OpenID Connect authorization server core.
//!
//! This crate provides:
//! - Authorization code flow with PKCE (RFC 6749, RFC 7636)
//! - Token exchange for the authorization_code, refresh_token, and
//!   client_credentials grants
//! - Token revocation and introspection (RFC 7009, RFC 7662)
//! - ID token signing and JWKS/discovery documents
//!
//! ## Modules
//!
//! - [`config`] - Server configuration
//! - [`oauth`] - Authorization requests, PKCE, client authentication
//! - [`token`] - Token issuance, verification, revocation, introspection
//! - [`storage`] - Narrow async storage traits the engine depends on
//! - [`http`] - Axum handlers for the protocol endpoints
//! - [`types`] - Domain types (clients, codes, tokens, scopes)
//!
//! The engine is stateless between requests and holds no global state;
//! services take their store handles and configuration by constructor
//! injection, so parallel instances (and parallel tests) are free.

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, OAuthConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use oauth::{
    AuthorizationConfig, AuthorizationService, AuthorizeRequest, PkceChallenge, PkceMethod,
    PkceVerifier, TokenRequest, TokenResponse,
};
pub use storage::{
    AccessTokenStore, ClientStore, CodeStore, RefreshTokenStore, Subject, SubjectStore,
};
pub use token::{
    AccessClaims, IntrospectionRequest, IntrospectionResponse, JwtService, RevocationRequest,
    SigningKeyPair, TokenConfig, TokenService,
};
pub use types::{AccessToken, AuthorizationCode, Client, GrantType, RefreshToken, ScopeSet};

/// Type alias for authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use gatehouse_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, OAuthConfig, SigningConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{
        AuthorizeState, DiscoveryState, IntrospectionState, JwksState, RevocationState,
        TokenState, UserInfoState, authorize_get, authorize_post, introspect_handler,
        jwks_handler, openid_configuration_handler, revoke_handler, token_handler,
        userinfo_handler,
    };
    pub use crate::oauth::{
        AuthorizationConfig, AuthorizationService, AuthorizeRequest, PkceChallenge, PkceMethod,
        PkceVerifier, TokenRequest, TokenResponse,
    };
    pub use crate::storage::{
        AccessTokenStore, ClientStore, CodeStore, RefreshTokenStore, Subject, SubjectStore,
    };
    pub use crate::token::{
        AccessClaims, IntrospectionRequest, IntrospectionResponse, JwtService, RevocationRequest,
        SigningKeyPair, TokenConfig, TokenService,
    };
    pub use crate::types::{
        AccessToken, AuthorizationCode, Client, GrantType, RefreshToken, ScopeSet,
    };
}
