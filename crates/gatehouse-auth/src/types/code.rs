//! Authorization code records.
//!
//! An authorization code bridges the authorize and token steps of the
//! authorization code flow. Codes are short-lived (default 10 minutes) and
//! strictly single-use: the store marks consumption with an atomic
//! conditional update so two concurrent redemptions cannot both succeed.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::pkce::PkceMethod;
use crate::types::scope::ScopeSet;

/// A single-use authorization code issued by the authorization endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// Unique record identifier.
    pub id: Uuid,

    /// The opaque code value: 256 bits of randomness, base64url-encoded.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Resource owner on whose behalf the code was issued.
    /// Authentication of the subject happens upstream of the engine.
    pub subject: String,

    /// Redirect URI used at issuance; the token request must repeat it exactly.
    pub redirect_uri: String,

    /// Scopes granted to the code.
    pub scope: ScopeSet,

    /// PKCE code challenge, when the client supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method accompanying the challenge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<PkceMethod>,

    /// OpenID Connect nonce for ID token binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Client state echoed back on the redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the code was redeemed. None until consumed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Generates a new cryptographically secure code value.
    ///
    /// 32 bytes (256 bits) from the system CSPRNG, base64url-encoded
    /// without padding (43 characters).
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the code has already been redeemed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Returns `true` if the code can still be redeemed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_consumed()
    }
}
