//! In-memory client store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gatehouse_auth::storage::ClientStore;
use gatehouse_auth::{AuthError, AuthResult, Client};

/// Client registrations held in memory.
///
/// Registration happens at construction or through [`register`]; the
/// protocol engine itself only reads.
///
/// [`register`]: MemoryClientStore::register
#[derive(Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClientStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, replacing any previous registration under the
    /// same `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration fails validation.
    pub fn register(&self, client: Client) -> AuthResult<()> {
        client
            .validate()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;
        self.clients
            .write()
            .expect("client store lock poisoned")
            .insert(client.client_id.clone(), client);
        Ok(())
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().expect("client store lock poisoned").len()
    }

    /// Returns `true` if no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self
            .clients
            .read()
            .expect("client store lock poisoned")
            .get(client_id)
            .cloned())
    }

    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
        Ok(self
            .clients
            .read()
            .expect("client store lock poisoned")
            .get(client_id)
            .map(|client| client.verify_secret(secret))
            .unwrap_or(false))
    }
}
