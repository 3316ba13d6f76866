//! BigKinds news search API client


pub mod images;
pub mod models;
pub mod retry;

pub use images::ImageResolver;
pub use models::{NewsArticle, SearchRequest, SearchResponse};
pub use retry::{RetryPolicy, with_retry};

use crate::config::BigKindsConfig;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

const SEARCH_PATH: &str = "/api/news/search.do";
const REFERER_PATH: &str = "/v2/news/index.do";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Longest error body excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum BigKindsError {
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Search rejected by BigKinds: {0}")]
    Rejected(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),

    #[error("No attempts made for {0}")]
    RetriesExhausted(String),
}

impl BigKindsError {
    /// Transient failures worth another attempt
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) | Self::Decode(_) | Self::Request(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Rejected(_) | Self::Configuration(_) | Self::RetriesExhausted(_) => false,
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout.as_secs())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Async HTTP client for the BigKinds search endpoint
#[derive(Debug, Clone)]
pub struct BigKindsClient {
    http: reqwest::Client,
    search_url: Url,
    timeout: Duration,
    rate_limit_delay: Duration,
    retry: RetryPolicy,
}

impl BigKindsClient {
    #[inline]
    pub fn new(config: &BigKindsConfig) -> Result<Self, BigKindsError> {
        let base_url = config
            .api_base_url()
            .map_err(|e| BigKindsError::Configuration(e.to_string()))?;
        let search_url = base_url
            .join(SEARCH_PATH)
            .map_err(|e| BigKindsError::Configuration(e.to_string()))?;

        let http = reqwest::Client::builder()
            .default_headers(default_headers(&base_url)?)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| BigKindsError::Configuration(e.to_string()))?;

        let retry = RetryPolicy {
            max_attempts: config.max_retries,
            initial_delay: Duration::from_millis(config.backoff_initial_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            ..RetryPolicy::default()
        };

        Ok(Self {
            http,
            search_url,
            timeout: config.timeout(),
            rate_limit_delay: config.rate_limit_delay(),
            retry,
        })
    }

    #[inline]
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Run a search, retrying transient failures with exponential backoff.
    ///
    /// An upstream `success: false` is not an error here; callers inspect
    /// [`SearchResponse::success`].
    #[inline]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BigKindsError> {
        debug!(
            "BigKinds API request: keyword='{}', page={}, count={}",
            request.keyword, request.start_no, request.result_number
        );

        let data = with_retry(&self.retry, "bigkinds_search", || self.post_search(request)).await?;
        let response = SearchResponse::from_api(&data, request);

        debug!(
            "BigKinds API response: success={}, total={}, fetched={}",
            response.success,
            response.total_count,
            response.articles.len()
        );

        Ok(response)
    }

    /// Number of matching articles, fetching a single result
    #[inline]
    pub async fn total_count(
        &self,
        keyword: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<u64, BigKindsError> {
        let request = SearchRequest::new(keyword, start_date, end_date).page(1, 1);
        let response = self.search(&request).await?;

        if !response.success {
            return Err(BigKindsError::Rejected(
                response
                    .error_message
                    .unwrap_or_else(|| "search failed".to_string()),
            ));
        }

        Ok(response.total_count)
    }

    async fn post_search(&self, request: &SearchRequest) -> Result<Value, BigKindsError> {
        if !self.rate_limit_delay.is_zero() {
            sleep(self.rate_limit_delay).await;
        }

        let response = self
            .http
            .post(self.search_url.clone())
            .json(&request.to_payload())
            .send()
            .await
            .map_err(|e| BigKindsError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BigKindsError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| BigKindsError::from_reqwest(e, self.timeout))?;

        serde_json::from_str(&body).map_err(|e| BigKindsError::Decode(e.to_string()))
    }
}

fn default_headers(base_url: &Url) -> Result<HeaderMap, BigKindsError> {
    let origin = base_url.origin().ascii_serialization();
    let referer = format!("{}{}", origin, REFERER_PATH);

    let mut headers = HeaderMap::new();
    let mut insert = |name: header::HeaderName, value: &str| -> Result<(), BigKindsError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| BigKindsError::Configuration(format!("{}: {}", name, e)))?;
        headers.insert(name, value);
        Ok(())
    };

    insert(
        header::ACCEPT,
        "application/json, text/javascript, */*; q=0.01",
    )?;
    insert(header::ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9")?;
    insert(header::CONTENT_TYPE, "application/json;charset=UTF-8")?;
    insert(header::ORIGIN, &origin)?;
    insert(header::REFERER, &referer)?;
    insert(header::USER_AGENT, USER_AGENT)?;
    insert(
        header::HeaderName::from_static("sec-fetch-dest"),
        "empty",
    )?;
    insert(header::HeaderName::from_static("sec-fetch-mode"), "cors")?;
    insert(
        header::HeaderName::from_static("sec-fetch-site"),
        "same-origin",
    )?;
    insert(
        header::HeaderName::from_static("x-requested-with"),
        "XMLHttpRequest",
    )?;

    Ok(headers)
}
