//! # Bitable Quotes
//!
//! A cached, normalized HTTP view over a Feishu (Lark) Bitable table of
//! classic quotes.
//!
//! The service authenticates against the Feishu open API, pulls the table's
//! field metadata and records (cursor pagination), normalizes the loosely
//! typed rows into flat `{id, text, author, category}` quotes, fingerprints
//! the result with a weak ETag, and serves it from a TTL-bounded file cache
//! with HTTP conditional-request (304) support.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌────────────┐
//! │ Feishu open  │──▶│ refresh chain       │──▶│ cache store │
//! │ API (HTTP)   │   │ auth→fetch→normalize│   │ (JSON file) │
//! └──────────────┘   └────────────────────┘   └─────┬──────┘
//!                                                   │
//!                               ┌───────────────────┤
//!                               ▼                   ▼
//!                          ┌──────────┐       ┌──────────┐
//!                          │   CLI    │       │   HTTP   │
//!                          │(quotesd) │       │  (axum)  │
//!                          └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML file + environment configuration |
//! | [`models`] | Wire and cache data types |
//! | [`client`] | Feishu Bitable API client |
//! | [`normalize`] | Row → quote normalization |
//! | [`fingerprint`] | Weak-ETag fingerprints |
//! | [`service`] | Refresh chain and read-through protocol |
//! | [`store`] | Cache store trait + file/memory backends |
//! | [`server`] | HTTP server |

pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod normalize;
pub mod server;
pub mod service;
pub mod store;
