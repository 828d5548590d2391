//! In-memory access and refresh token stores.
//!
//! Both stores index records by token digest, matching the unique-index
//! lookup a relational backend would use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use gatehouse_auth::storage::{AccessTokenStore, RefreshTokenStore};
use gatehouse_auth::{AccessToken, AuthResult, RefreshToken};

/// Access tokens held in memory, keyed by digest.
#[derive(Default)]
pub struct MemoryAccessTokenStore {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl MemoryAccessTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessTokenStore for MemoryAccessTokenStore {
    async fn create(&self, token: &AccessToken) -> AuthResult<()> {
        self.tokens
            .write()
            .expect("access token store lock poisoned")
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<AccessToken>> {
        Ok(self
            .tokens
            .read()
            .expect("access token store lock poisoned")
            .get(token_hash)
            .cloned())
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        let mut tokens = self
            .tokens
            .write()
            .expect("access token store lock poisoned");
        match tokens.get_mut(token_hash) {
            Some(token) => {
                if token.revoked_at.is_none() {
                    token.revoked_at = Some(OffsetDateTime::now_utc());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut tokens = self
            .tokens
            .write()
            .expect("access token store lock poisoned");
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired());
        Ok((before - tokens.len()) as u64)
    }
}

/// Refresh tokens held in memory, keyed by digest.
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl MemoryRefreshTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens
            .write()
            .expect("refresh token store lock poisoned")
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .read()
            .expect("refresh token store lock poisoned")
            .get(token_hash)
            .cloned())
    }

    async fn revoke(&self, token_hash: &str) -> AuthResult<bool> {
        let mut tokens = self
            .tokens
            .write()
            .expect("refresh token store lock poisoned");
        match tokens.get_mut(token_hash) {
            Some(token) => {
                if token.revoked_at.is_none() {
                    token.revoked_at = Some(OffsetDateTime::now_utc());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_last_used(&self, token_hash: &str) -> AuthResult<()> {
        let mut tokens = self
            .tokens
            .write()
            .expect("refresh token store lock poisoned");
        if let Some(token) = tokens.get_mut(token_hash) {
            token.last_used_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut tokens = self
            .tokens
            .write()
            .expect("refresh token store lock poisoned");
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired());
        Ok((before - tokens.len()) as u64)
    }
}
