//! Authorization server configuration.
//!
//! Deserializable from TOML; every field has a sensible default so an empty
//! config section yields a working server.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://auth.example.com"
//!
//! [auth.oauth]
//! authorization_code_lifetime = "10m"
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "30d"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authorization server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Server issuer URL (used in token `iss` claims and discovery).
    pub issuer: String,

    /// OAuth 2.0 configuration.
    pub oauth: OAuthConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

/// OAuth 2.0 protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime. Codes are short-lived.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Rotate refresh tokens on use.
    ///
    /// Off by default: refresh keeps the original token and stamps its
    /// last-used time. Turning rotation on is a hardening option that
    /// shortens the replay window for stolen refresh tokens.
    pub refresh_token_rotation: bool,

    /// Issue access tokens as signed JWT assertions instead of opaque
    /// strings, for resource servers that verify statelessly.
    pub signed_access_tokens: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            refresh_token_rotation: false,
            signed_access_tokens: false,
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Key ID for a key loaded from PEM. Ignored when keys are generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    /// Path to a PEM-encoded RSA private key. When absent, a fresh key
    /// pair is generated at startup (tokens do not survive restarts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,

    /// Path to the matching PEM-encoded RSA public key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_path: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            private_key_path: None,
            public_key_path: None,
        }
    }
}
