//! File-backed [`CacheStore`]: one pretty-printed JSON document.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::QuoteError;
use crate::models::QuotePayload;

use super::CacheStore;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self) -> Result<Option<QuotePayload>, QuoteError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let payload = serde_json::from_str(&raw)
            .map_err(|e| QuoteError::Cache(format!("corrupt cache file: {}", e)))?;
        Ok(Some(payload))
    }

    async fn put(&self, payload: &QuotePayload) -> Result<(), QuoteError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(payload)
            .map_err(|e| QuoteError::Cache(e.to_string()))?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(())
    }
}
