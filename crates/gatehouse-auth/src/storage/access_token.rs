//! Access token store trait.
//!
//! Tokens are indexed by SHA-256 digest only; the plaintext value never
//! reaches storage.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::token::AccessToken;

/// Store for access token records.
#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    /// Persists a new access token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored.
    async fn create(&self, token: &AccessToken) -> AuthResult<()>;

    /// Finds a token by its value digest.
    ///
    /// Returns records regardless of expiry/revocation status; callers
    /// check `is_valid()` themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<AccessToken>>;

    /// Revokes a token by its value digest.
    ///
    /// Returns `true` if a record was found (whether or not it was already
    /// revoked). Idempotent: revoking an unknown or already-revoked token
    /// is not an error, and the boolean exists only so the revocation
    /// service can fall through to the refresh-token store — it is never
    /// surfaced to callers.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<bool>;

    /// Deletes expired tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
