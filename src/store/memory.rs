//! In-memory [`CacheStore`] implementation for tests.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::QuoteError;
use crate::models::QuotePayload;

use super::CacheStore;

/// In-memory store holding at most one payload behind an `RwLock`.
pub struct MemoryStore {
    inner: RwLock<Option<QuotePayload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self) -> Result<Option<QuotePayload>, QuoteError> {
        Ok(self.inner.read().unwrap().clone())
    }

    async fn put(&self, payload: &QuotePayload) -> Result<(), QuoteError> {
        *self.inner.write().unwrap() = Some(payload.clone());
        Ok(())
    }
}
