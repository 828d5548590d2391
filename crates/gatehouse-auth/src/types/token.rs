//! Access and refresh token records.
//!
//! Token plaintext is returned to the client exactly once at issuance.
//! Only a SHA-256 digest is persisted; lookups hash the presented value and
//! search by digest, so a storage compromise does not yield usable tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::scope::ScopeSet;

/// Hashes a token value for storage and lookup.
///
/// Deterministic SHA-256, hex-encoded. Equal inputs always produce equal
/// outputs; the digest cannot be inverted into the bearer value.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a cryptographically secure opaque token value.
///
/// 256 bits from the system CSPRNG, base64url-encoded (43 characters).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A bearer access token record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Unique record identifier; doubles as the `jti` claim.
    pub id: Uuid,

    /// SHA-256 hex digest of the token value.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Resource owner; absent for client_credentials tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Granted scopes.
    pub scope: ScopeSet,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was revoked. None while the token is live.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// The refresh token this access token was minted from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<Uuid>,
}

impl AccessToken {
    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token is neither expired nor revoked.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}

/// A refresh token record.
///
/// Longer-lived than access tokens; mutated only to stamp `last_used_at`
/// on refresh or `revoked_at` on revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique record identifier.
    pub id: Uuid,

    /// SHA-256 hex digest of the token value.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Resource owner who authorized the grant.
    pub subject: String,

    /// Granted scopes.
    pub scope: ScopeSet,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was revoked. None while the token is live.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Last time the token minted a new access token.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_used_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token is neither expired nor revoked.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}
