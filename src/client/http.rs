use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use scraper::{Html, Selector};

use super::identity::RequestIdentity;
use super::retry::{retry, RetryPolicy};
use super::{FetchError, FetchResult, InterestFetcher};
use crate::config::EventConfig;

const INTEREST_MARKER: &str = "are interested";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches event pages over HTTP and picks out the interest text.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(retry: RetryPolicy) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, retry })
    }

    async fn fetch_once(&self, url: &Url, origin: &str) -> FetchResult<String> {
        let identity = RequestIdentity::random(&mut rand::rng());
        tracing::debug!("GET {} as {}", url, identity.user_agent);

        let mut request = self.client.get(url.clone());
        for (name, value) in identity.headers(origin) {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        classify(response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        find_interest_text(&body).ok_or(FetchError::MarkerNotFound)
    }
}

#[async_trait]
impl InterestFetcher for HttpFetcher {
    async fn fetch(&self, event: &EventConfig) -> FetchResult<String> {
        let url = Url::parse(&event.url).map_err(|_| FetchError::InvalidUrl(event.url.clone()))?;
        let origin = url.origin().ascii_serialization();

        tracing::info!("Fetching interest for {} from {}", event.code, url);
        retry(&self.retry, |_| self.fetch_once(&url, &origin)).await
    }
}

/// 403 and 429 mean the page is refusing us; anything else outside 2xx is a
/// plain HTTP failure.
pub fn classify(status: StatusCode) -> FetchResult<()> {
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Blocked(status.as_u16()));
    }
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(())
}

/// Text of the tightest `div`, `span` or `p` whose content mentions the
/// interest marker. Text nodes are trimmed and joined with single spaces.
pub fn find_interest_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div, span, p").ok()?;

    document
        .select(&selector)
        .map(|element| {
            element
                .text()
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| text.to_lowercase().contains(INTEREST_MARKER))
        .min_by_key(String::len)
}
