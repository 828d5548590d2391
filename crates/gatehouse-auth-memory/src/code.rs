//! In-memory authorization code store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use gatehouse_auth::storage::CodeStore;
use gatehouse_auth::{AuthError, AuthResult, AuthorizationCode};

/// Authorization codes held in memory, keyed by code value.
#[derive(Default)]
pub struct MemoryCodeStore {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl MemoryCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        let mut codes = self.codes.write().expect("code store lock poisoned");
        if codes.contains_key(&code.code) {
            return Err(AuthError::storage("Duplicate authorization code value"));
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self
            .codes
            .read()
            .expect("code store lock poisoned")
            .get(code)
            .cloned())
    }

    async fn consume(&self, code: &str) -> AuthResult<AuthorizationCode> {
        // Check-and-mark under one write guard: the in-memory equivalent of
        // `UPDATE ... SET consumed_at = NOW() WHERE code = $1 AND consumed_at IS NULL`.
        let mut codes = self.codes.write().expect("code store lock poisoned");

        let record = codes
            .get_mut(code)
            .ok_or_else(|| AuthError::invalid_grant("Unknown authorization code"))?;

        if record.is_consumed() {
            return Err(AuthError::invalid_grant("Authorization code already used"));
        }

        record.consumed_at = Some(OffsetDateTime::now_utc());
        Ok(record.clone())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut codes = self.codes.write().expect("code store lock poisoned");
        let before = codes.len();
        codes.retain(|_, code| !code.is_expired());
        Ok((before - codes.len()) as u64)
    }
}
