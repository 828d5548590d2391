//! Subject (resource owner) store trait.
//!
//! The engine never manages subjects; it only reads the claims the
//! userinfo endpoint serves. Provisioning and authentication of subjects
//! belong to the surrounding identity layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// Claims known about a resource owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Stable subject identifier (the `sub` claim).
    pub id: String,

    /// Preferred username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Display name (released under the `profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address (released under the `email` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the email address has been verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// Read-side store for subject claims.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// Finds a subject by its identifier.
    ///
    /// Returns `None` if the subject is unknown; the userinfo endpoint
    /// then serves the bare `sub` claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, subject_id: &str) -> AuthResult<Option<Subject>>;
}
