use async_trait::async_trait;
use thiserror::Error;

use crate::config::EventConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("blocked (HTTP {0})")]
    Blocked(u16),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid event url {0}")]
    InvalidUrl(String),
    #[error("interest text not found on page")]
    MarkerNotFound,
    #[error("all {attempts} attempts failed, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Errors worth another attempt within the same run.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_) | Self::RetriesExhausted { .. })
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of the raw text fragment that carries an event's interest count.
#[async_trait]
pub trait InterestFetcher: Send + Sync {
    async fn fetch(&self, event: &EventConfig) -> FetchResult<String>;
}
