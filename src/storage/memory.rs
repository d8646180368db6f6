//! In-process token storage.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::SecurityResult;
use crate::storage::{AuthTokens, SecureStorage};

/// Thread-safe in-memory store; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `tokens`.
    pub fn with_tokens(tokens: &AuthTokens) -> SecurityResult<Self> {
        let storage = Self::new();
        storage.set_auth_tokens(tokens)?;
        Ok(storage)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SecureStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> SecurityResult<()> {
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> SecurityResult<()> {
        self.inner.remove(key);
        Ok(())
    }
}
