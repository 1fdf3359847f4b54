//! Feishu Bitable API client.
//!
//! Thin, single-attempt wrapper over the Feishu open API: exchanges the
//! application credentials for a tenant access token, then reads the table's
//! field metadata and records (cursor pagination). No retry or backoff —
//! callers decide how to handle failures.
//!
//! # Upstream contract
//!
//! | Call | Endpoint |
//! |------|----------|
//! | auth | `POST /open-apis/auth/v3/tenant_access_token/internal` |
//! | fields | `GET /open-apis/bitable/v1/apps/{base}/tables/{table}/fields` |
//! | records | `GET /open-apis/bitable/v1/apps/{base}/tables/{table}/records` |
//!
//! Every response carries a `code` field; `code == 0` signals success and
//! anything else is surfaced as an error with the upstream's `msg`.

use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::error::QuoteError;
use crate::models::{FieldMeta, RawRecord};

const FIELD_PAGE_SIZE: &str = "200";
const RECORD_PAGE_SIZE: &str = "100";

/// Safety cap on record pagination. The upstream cursor protocol should
/// terminate on its own; the cap only guards against an API that never
/// reports completion, and reaching it stops iteration without error.
const MAX_RECORD_PAGES: usize = 1000;

pub struct BitableClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
    base_token: String,
    table_id: String,
    view_id: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    msg: Option<String>,
    tenant_access_token: Option<String>,
}

#[derive(Deserialize)]
struct FieldsResponse {
    code: i64,
    msg: Option<String>,
    data: Option<FieldsData>,
}

#[derive(Deserialize, Default)]
struct FieldsData {
    #[serde(default)]
    items: Vec<FieldMeta>,
}

#[derive(Deserialize)]
struct RecordsResponse {
    code: i64,
    msg: Option<String>,
    data: Option<RecordsData>,
}

#[derive(Deserialize, Default)]
struct RecordsData {
    #[serde(default)]
    items: Vec<RecordItem>,
    #[serde(default)]
    has_more: bool,
    page_token: Option<String>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RecordItem {
    record_id: String,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl BitableClient {
    pub fn new(config: &Config) -> Result<Self, QuoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.upstream.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            base_token: config.base_token.clone(),
            table_id: config.table_id.clone(),
            view_id: config.view_id.clone(),
        })
    }

    /// Exchange app credentials for a short-lived tenant access token.
    pub async fn tenant_access_token(&self) -> Result<String, QuoteError> {
        let url = format!(
            "{}/open-apis/auth/v3/tenant_access_token/internal",
            self.base_url
        );
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "app_id": self.app_id,
                "app_secret": self.app_secret,
            }))
            .send()
            .await
            .map_err(|e| QuoteError::Auth(e.to_string()))?;

        let status = resp.status();
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| QuoteError::Auth(format!("unreadable auth response ({}): {}", status, e)))?;

        if !status.is_success() || body.code != 0 {
            return Err(QuoteError::Auth(
                body.msg.unwrap_or_else(|| status.to_string()),
            ));
        }
        body.tenant_access_token
            .ok_or_else(|| QuoteError::Auth("token missing from auth response".to_string()))
    }

    /// Fetch the table's field metadata (id, name, type per column).
    pub async fn list_fields(&self, token: &str) -> Result<Vec<FieldMeta>, QuoteError> {
        let url = format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/fields",
            self.base_url, self.base_token, self.table_id
        );
        let resp = self
            .http
            .get(&url)
            .query(&[("page_size", FIELD_PAGE_SIZE)])
            .bearer_auth(token)
            .send()
            .await?;

        let status = resp.status();
        let body: FieldsResponse = resp.json().await.map_err(|e| {
            QuoteError::Upstream(format!("unreadable fields response ({}): {}", status, e))
        })?;

        if !status.is_success() || body.code != 0 {
            return Err(QuoteError::Upstream(format!(
                "fields fetch failed: {}",
                body.msg.unwrap_or_else(|| status.to_string())
            )));
        }
        Ok(body.data.unwrap_or_default().items)
    }

    /// Fetch all records, following the `has_more`/`page_token` cursor.
    pub async fn list_records(&self, token: &str) -> Result<Vec<RawRecord>, QuoteError> {
        let url = format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/records",
            self.base_url, self.base_token, self.table_id
        );

        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_RECORD_PAGES {
            let mut req = self
                .http
                .get(&url)
                .query(&[("page_size", RECORD_PAGE_SIZE)])
                .bearer_auth(token);
            if let Some(view) = &self.view_id {
                req = req.query(&[("view_id", view.as_str())]);
            }
            if let Some(cursor) = &page_token {
                req = req.query(&[("page_token", cursor.as_str())]);
            }

            let resp = req.send().await?;
            let status = resp.status();
            let body: RecordsResponse = resp.json().await.map_err(|e| {
                QuoteError::Upstream(format!("unreadable records response ({}): {}", status, e))
            })?;

            if !status.is_success() || body.code != 0 {
                return Err(QuoteError::Upstream(format!(
                    "records fetch failed: {}",
                    body.msg.unwrap_or_else(|| status.to_string())
                )));
            }

            let data = body.data.unwrap_or_default();
            for item in data.items {
                records.push(RawRecord {
                    record_id: item.record_id,
                    fields: item.fields,
                });
            }

            if !data.has_more {
                break;
            }
            page_token = data
                .page_token
                .filter(|t| !t.is_empty())
                .or(data.next_page_token);
        }

        Ok(records)
    }
}
