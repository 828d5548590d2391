//! In-memory subject store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gatehouse_auth::storage::{Subject, SubjectStore};
use gatehouse_auth::AuthResult;

/// Subject claims held in memory.
#[derive(Default)]
pub struct MemorySubjectStore {
    subjects: RwLock<HashMap<String, Subject>>,
}

impl MemorySubjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a subject record.
    pub fn insert(&self, subject: Subject) {
        self.subjects
            .write()
            .expect("subject store lock poisoned")
            .insert(subject.id.clone(), subject);
    }
}

#[async_trait]
impl SubjectStore for MemorySubjectStore {
    async fn find_by_id(&self, subject_id: &str) -> AuthResult<Option<Subject>> {
        Ok(self
            .subjects
            .read()
            .expect("subject store lock poisoned")
            .get(subject_id)
            .cloned())
    }
}
