//! The refresh chain and the cache/refresh protocol.
//!
//! [`QuoteService::refresh`] runs the full upstream chain
//! (authenticate → fields → records → normalize → fingerprint) and stamps a
//! fresh payload. [`QuoteService::read_through`] wraps it with the cache
//! protocol shared by the CLI `fetch` command and the HTTP handler:
//!
//! 1. Unless forced, a stored payload younger than the TTL is served as-is.
//! 2. Otherwise the upstream chain runs, and the result is persisted
//!    best-effort — a cache write failure is logged, never propagated.
//!
//! Upstream calls are sequential and single-attempt; a failed refresh fails
//! the current read, and the next read starts the chain over.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::{debug, info, warn};

use crate::client::BitableClient;
use crate::error::QuoteError;
use crate::fingerprint::fingerprint;
use crate::models::{QuotePayload, PAYLOAD_SOURCE};
use crate::normalize::normalize;
use crate::store::CacheStore;

pub struct QuoteService {
    client: BitableClient,
}

/// Where a payload came from. Only a cache hit may answer an HTTP
/// conditional request with 304; a refresh always produces a full response.
pub enum ReadOutcome {
    Cached(QuotePayload),
    Refreshed(QuotePayload),
}

impl ReadOutcome {
    pub fn payload(&self) -> &QuotePayload {
        match self {
            ReadOutcome::Cached(p) | ReadOutcome::Refreshed(p) => p,
        }
    }

    pub fn into_payload(self) -> QuotePayload {
        match self {
            ReadOutcome::Cached(p) | ReadOutcome::Refreshed(p) => p,
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, ReadOutcome::Cached(_))
    }
}

impl QuoteService {
    pub fn new(client: BitableClient) -> Self {
        Self { client }
    }

    /// Run the full upstream chain and assemble a payload stamped `now`.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<QuotePayload, QuoteError> {
        let token = self.client.tenant_access_token().await?;
        let schema = self.client.list_fields(&token).await?;
        let records = self.client.list_records(&token).await?;
        let quotes = normalize(&records, &schema);
        let etag = fingerprint(&quotes);
        info!(
            "refreshed {} quotes from {} records across {} fields",
            quotes.len(),
            records.len(),
            schema.len()
        );

        Ok(QuotePayload {
            source: PAYLOAD_SOURCE.to_string(),
            updated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            schema,
            records,
            quotes,
            etag: Some(etag),
        })
    }

    /// The cache/refresh protocol. Returns the payload and whether it came
    /// from the cache. Cache read failures are treated as a miss; cache
    /// write failures are logged and swallowed.
    pub async fn read_through(
        &self,
        store: &dyn CacheStore,
        ttl: Duration,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<ReadOutcome, QuoteError> {
        if !force {
            match store.get().await {
                Ok(Some(mut payload)) if is_fresh(&payload.updated_at, now, ttl) => {
                    // Payloads written by older builds may lack the etag.
                    if payload.etag.is_none() {
                        payload.etag = Some(fingerprint(&payload.quotes));
                    }
                    debug!("cache hit (updated {})", payload.updated_at);
                    return Ok(ReadOutcome::Cached(payload));
                }
                Ok(Some(payload)) => debug!("cache expired (updated {})", payload.updated_at),
                Ok(None) => debug!("cache miss"),
                Err(e) => warn!("cache read failed, treating as miss: {}", e),
            }
        }

        let payload = self.refresh(now).await?;
        if let Err(e) = store.put(&payload).await {
            warn!("cache write failed, serving response anyway: {}", e);
        }
        Ok(ReadOutcome::Refreshed(payload))
    }
}

/// A payload is fresh while `now - updated_at < ttl`. An unparsable
/// timestamp is stale.
pub fn is_fresh(updated_at: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
    match DateTime::parse_from_rfc3339(updated_at) {
        Ok(updated) => now.signed_duration_since(updated.with_timezone(&Utc)) < ttl,
        Err(_) => false,
    }
}
