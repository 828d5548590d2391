//! Token revocation wire types (RFC 7009).
//!
//! The revocation endpoint reports success for unknown and already-revoked
//! tokens alike; nothing in the response distinguishes the cases.

use serde::{Deserialize, Serialize};

/// Token revocation request per RFC 7009.
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke.
    pub token: String,

    /// Optional hint about the token type. The server falls back to the
    /// other store when the hinted lookup misses.
    #[serde(default)]
    pub token_type_hint: Option<TokenTypeHint>,
}

/// Token type hint for revocation and introspection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Parses a hint string; unknown hints are ignored per RFC 7009.
    #[must_use]
    pub fn parse(hint: &str) -> Option<Self> {
        match hint {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Returns the hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Revocation success body.
///
/// RFC 7009 allows an empty 200; the wire format here mirrors the original
/// service's `{"success": true}` acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct RevocationResponse {
    /// Always `true`; revocation never reports failure for token state.
    pub success: bool,
}

impl RevocationResponse {
    /// The constant success acknowledgement.
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}
