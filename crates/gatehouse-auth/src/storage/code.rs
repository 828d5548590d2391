//! Authorization code store trait.
//!
//! # Security Considerations
//!
//! - Never log authorization code values
//! - `consume` must be atomic: two concurrent redemptions of the same code
//!   must result in exactly one success

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::code::AuthorizationCode;

/// Store for single-use authorization codes.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Persists a freshly minted authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored (duplicate value,
    /// storage unavailable).
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds a code record by its opaque value.
    ///
    /// Returns records regardless of consumed/expired status; callers check
    /// `is_valid()` themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Consumes an authorization code: marks it used and returns the record.
    ///
    /// This is the one operation that must be a single atomic conditional
    /// mutation — "mark consumed only if currently unconsumed" — so that two
    /// concurrent redemptions produce exactly one success. The relational
    /// equivalent:
    ///
    /// ```sql
    /// UPDATE authorization_codes
    /// SET consumed_at = NOW()
    /// WHERE code = $1 AND consumed_at IS NULL
    /// RETURNING *
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the code is unknown or already consumed,
    /// or a storage error if the operation fails. Expiry is not checked
    /// here; the caller rejects expired codes after the consume.
    async fn consume(&self, code: &str) -> AuthResult<AuthorizationCode>;

    /// Deletes expired codes.
    ///
    /// Called periodically to bound storage growth.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
