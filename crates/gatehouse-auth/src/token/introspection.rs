//! Token introspection wire types (RFC 7662).
//!
//! A token that is missing, expired, or revoked introspects to
//! `{"active": false}` with no further detail; the response never reveals
//! which of the three applied.

use serde::{Deserialize, Serialize};

use super::revocation::TokenTypeHint;

/// Token introspection request per RFC 7662.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    pub token: String,

    /// Optional hint about the token type.
    #[serde(default)]
    pub token_type_hint: Option<TokenTypeHint>,
}

/// Token introspection response per RFC 7662.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active. The only required field.
    pub active: bool,

    /// Space-separated scopes granted to the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Subject identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Token type, "Bearer" for access tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl IntrospectionResponse {
    /// The response for invalid, expired, revoked, or unknown tokens.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            active: false,
            ..Default::default()
        }
    }

    /// Starts an active response.
    #[must_use]
    pub fn active() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the token type.
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub fn with_exp(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Sets the issued-at time.
    #[must_use]
    pub fn with_iat(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }
}
