//! OAuth 2.0 client registration types.
//!
//! Clients are registered out of band (admin tooling, config files) and are
//! read-only from the protocol engine's perspective.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::types::scope::ScopeSet;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
///
/// Defines the authorization flows a client is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with PKCE for public clients).
    AuthorizationCode,
    /// Client Credentials flow (confidential clients only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth 2.0 client application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// SHA-256 hex digest of the client secret (confidential clients only).
    /// The plaintext secret is never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Human-readable display name.
    pub name: String,

    /// OAuth 2.0 grant types this client is allowed to use.
    pub grant_types: Vec<GrantType>,

    /// OAuth 2.0 response types this client is allowed to request.
    #[serde(default = "default_response_types")]
    pub response_types: Vec<String>,

    /// Allowed redirect URIs for the authorization code flow.
    /// Matching is exact string comparison; no wildcard or prefix rules.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Scopes this client is allowed to request.
    /// Empty list means all scopes are allowed.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Whether this is a confidential client (holds a secret).
    pub confidential: bool,

    /// Whether this client is currently active.
    pub active: bool,

    /// Whether PKCE is required for the authorization code flow.
    /// Public clients always require PKCE regardless of this setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkce_required: Option<bool>,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,
}

fn default_response_types() -> Vec<String> {
    vec!["code".to_string()]
}

impl Client {
    /// Validates the client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is internally inconsistent.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        // Public clients cannot use client_credentials
        if !self.confidential && self.grant_types.contains(&GrantType::ClientCredentials) {
            return Err(ClientValidationError::PublicClientCredentials);
        }

        // Confidential clients must have a client secret
        if self.confidential && self.client_secret.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        // Authorization code flow requires redirect URIs
        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        Ok(())
    }

    /// Checks if the given redirect URI is registered for this client.
    ///
    /// Exact string match only.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given scope token is allowed for this client.
    ///
    /// An empty registered scope list means all scopes are allowed.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|allowed| allowed == scope)
    }

    /// Validates a requested scope set against this client's allowed scopes.
    ///
    /// Any scope outside the allowed set fails the whole request; there is
    /// no partial grant.
    ///
    /// # Errors
    ///
    /// Returns the first offending scope token.
    pub fn validate_scopes(&self, requested: &ScopeSet) -> Result<(), String> {
        for scope in requested.iter() {
            if !self.is_scope_allowed(scope) {
                return Err(scope.to_string());
            }
        }
        Ok(())
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Checks if the given response type is registered for this client.
    #[must_use]
    pub fn is_response_type_allowed(&self, response_type: &str) -> bool {
        self.response_types.iter().any(|rt| rt == response_type)
    }

    /// Returns whether PKCE is required for this client.
    ///
    /// Public clients always require PKCE. Confidential clients follow the
    /// `pkce_required` setting (default off).
    #[must_use]
    pub fn requires_pkce(&self) -> bool {
        if !self.confidential {
            true
        } else {
            self.pkce_required.unwrap_or(false)
        }
    }

    /// Returns the access token lifetime in seconds (default 3600).
    #[must_use]
    pub fn access_token_lifetime_secs(&self) -> i64 {
        self.access_token_lifetime.unwrap_or(3600)
    }

    /// Returns the refresh token lifetime in seconds (default 30 days).
    #[must_use]
    pub fn refresh_token_lifetime_secs(&self) -> i64 {
        self.refresh_token_lifetime.unwrap_or(2_592_000)
    }

    /// Computes the stored digest for a plaintext client secret.
    #[must_use]
    pub fn hash_secret(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verifies a presented plaintext secret against the stored digest.
    ///
    /// The digest comparison is constant-time so the check does not leak
    /// how much of the secret matched.
    #[must_use]
    pub fn verify_secret(&self, presented: &str) -> bool {
        let Some(ref stored) = self.client_secret else {
            return false;
        };
        let digest = Self::hash_secret(presented);
        digest.as_bytes().ct_eq(stored.as_bytes()).into()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client registration validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// Public clients cannot use client_credentials grant.
    #[error("Public clients cannot use client_credentials grant")]
    PublicClientCredentials,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Confidential clients require a client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,
}

// =============================================================================
// Tests
// =============================================================================
