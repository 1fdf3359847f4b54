//! Cache storage abstraction.
//!
//! The [`CacheStore`] trait holds the most recent [`QuotePayload`] for this
//! deployment (one payload per fixed table configuration — there is no
//! multi-table keying). Backends: [`file::FileStore`] for production,
//! [`memory::MemoryStore`] for tests.
//!
//! # Contract
//!
//! The cache is an optimization, never a correctness requirement. Callers
//! treat a failed [`get`](CacheStore::get) as a miss and fall through to the
//! upstream, and log-and-ignore a failed [`put`](CacheStore::put) — a
//! persistence failure must never fail the response being served.
//!
//! Concurrent writers are not coordinated: two requests that both observe a
//! stale cache may each refresh and write, and the last writer wins. Both
//! payloads are equally valid reads of an idempotent upstream, so this race
//! has no correctness impact.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::QuoteError;
use crate::models::QuotePayload;

/// Abstract storage for the latest quote payload.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The stored payload, or `None` when nothing has been written yet.
    async fn get(&self) -> Result<Option<QuotePayload>, QuoteError>;

    /// Replace the stored payload.
    async fn put(&self, payload: &QuotePayload) -> Result<(), QuoteError>;
}
