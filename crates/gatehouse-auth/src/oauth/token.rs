//! Token endpoint wire types.
//!
//! Request parsing, response generation, and error shapes for the OAuth 2.0
//! token endpoint.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange an authorization code for tokens
//! - `refresh_token` - Mint a new access token from a refresh token
//! - `client_credentials` - Machine-to-machine authentication

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token request parameters.
///
/// One structure covers all grant types; which fields are required depends
/// on `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, client_id, code_verifier (PKCE)
/// - `refresh_token`: refresh_token, optional scope (narrowing only)
/// - `client_credentials`: optional scope
///
/// Clients authenticate with HTTP Basic Auth (not in this struct), with
/// `client_id` + `client_secret` in the body, or with `client_id` alone
/// (public clients).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: String,

    /// Authorization code (authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI; must match the authorization request exactly.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID (public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope. For refresh_token it must be a subset of the
    /// original grant.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenRequest {
    /// A request skeleton used when authenticating clients on endpoints
    /// that share the token endpoint's authentication rules.
    #[must_use]
    pub fn for_client_auth(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            grant_type: String::new(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            client_id,
            client_secret,
            refresh_token: None,
            scope: None,
        }
    }
}

/// Successful token response per RFC 6749 Section 5.1.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "2YotnFZFEjr1zCsicMWpAA",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "openid profile",
///   "refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Refresh token; absent for client_credentials grants.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (openid scope only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: String) -> Self {
        self.id_token = Some(token);
        self
    }
}

/// Token error response per RFC 6749 Section 5.2.
#[derive(Debug, Clone, Serialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }
}

/// OAuth 2.0 token error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The grant (code or refresh token) is invalid, expired, revoked, or
    /// was issued to another client.
    InvalidGrant,

    /// The client is not authorized to use this grant type.
    UnauthorizedClient,

    /// The grant type is not supported by the server.
    UnsupportedGrantType,

    /// The requested scope is invalid or exceeds the granted scope.
    InvalidScope,

    /// The server encountered an internal error. Detail is never exposed.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::ServerError => 500,
            Self::InvalidRequest
            | Self::InvalidGrant
            | Self::UnauthorizedClient
            | Self::UnsupportedGrantType
            | Self::InvalidScope => 400,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
