//! Core data models used throughout the quotes pipeline.
//!
//! These types mirror the JSON shapes exchanged with the Feishu Bitable API
//! and the payload document written to the cache store.

use serde::{Deserialize, Serialize};

/// One column of the Bitable table, as returned by the fields endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMeta {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// One table row with its loosely typed cell values.
///
/// Cell values can be strings, numbers, booleans, lists, or nested objects
/// carrying `text`/`name`/`title` sub-keys, depending on the column type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub record_id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A normalized quote. `text` is always non-empty; `id` is the 1-based
/// position after empty-text rows have been dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u32,
    pub text: String,
    pub author: String,
    pub category: String,
}

/// The unit written to and read from the cache store, and the body of a
/// successful `GET /api/quotes` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    /// Origin tag, always `"feishu-bitable"`.
    pub source: String,
    /// ISO-8601 timestamp of the refresh that produced this payload.
    pub updated_at: String,
    pub schema: Vec<FieldMeta>,
    pub records: Vec<RawRecord>,
    pub quotes: Vec<Quote>,
    /// Weak ETag over `quotes`. Absent in payloads written by older builds;
    /// readers recompute it when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Origin tag stamped into every payload.
pub const PAYLOAD_SOURCE: &str = "feishu-bitable";
