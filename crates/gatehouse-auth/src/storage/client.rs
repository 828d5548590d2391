//! Client store trait.
//!
//! The engine reads client registrations and verifies secrets through this
//! interface only; registration and mutation belong to admin tooling.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Read-side store for OAuth 2.0 client registrations.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Finds a client by its OAuth `client_id`.
    ///
    /// Returns `None` if no client with that id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Verifies a presented plaintext secret against the stored digest.
    ///
    /// Implementations must compare digests in constant time and must not
    /// report whether the client exists versus the secret being wrong.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool>;
}
