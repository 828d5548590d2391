//! Refresh token store trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 digests only
//! - Revocation must take effect immediately
//! - Expired tokens should be cleaned up periodically

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::token::RefreshToken;

/// Store for refresh token records.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persists a new refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a token by its value digest.
    ///
    /// Returns records regardless of expiry/revocation status; callers
    /// check `is_valid()` themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Revokes a token by its value digest.
    ///
    /// Returns `true` if a record was found. Idempotent; see
    /// [`AccessTokenStore::revoke`](crate::storage::AccessTokenStore::revoke)
    /// for the contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<bool>;

    /// Stamps the token's `last_used_at` with the current time.
    ///
    /// Called on every successful refresh; the token itself is not
    /// reissued.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn touch_last_used(&self, token_hash: &str) -> AuthResult<()>;

    /// Deletes expired tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
