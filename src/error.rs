use thiserror::Error;

/// Error type for configuration, upstream Feishu calls, and cache IO.
///
/// `Cache` errors never surface to HTTP clients: callers treat a failed
/// cache read as a miss and a failed cache write as a logged no-op.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("missing configuration: {0}")]
    Config(String),
    #[error("Feishu auth failed: {0}")]
    Auth(String),
    #[error("Feishu request failed: {0}")]
    Upstream(String),
    #[error("cache store failure: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        QuoteError::Upstream(err.to_string())
    }
}

impl From<std::io::Error> for QuoteError {
    fn from(err: std::io::Error) -> Self {
        QuoteError::Cache(err.to_string())
    }
}
