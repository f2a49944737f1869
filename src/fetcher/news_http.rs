//! HTTP client for the day-filtered news listing
//!
//! One call per page, no retries. A failed page is reported to the caller
//! with the status and raw body so the export logs are actionable.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::fetcher::news_config::NEWS_API_CONFIG;
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{FetcherError, FetcherResult, PageFetcher, PageRequest};
use crate::metrics::PageRequestMetrics;
use crate::Story;

/// REST client for the news listing endpoint
pub struct NewsHttpClient {
    client: Arc<Client>,
    base_url: String,
    token: String,
}

impl NewsHttpClient {
    /// Create a client against `base_url` using the shared connection pool.
    ///
    /// # Arguments
    /// * `base_url` - Scheme and host, without a trailing slash (e.g., "<https://api.benzinga.com>")
    /// * `token` - API token sent as a query parameter
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(global_http_client(), base_url, token)
    }

    /// Create a client against the production host.
    pub fn with_default_base(token: impl Into<String>) -> Self {
        Self::new(NEWS_API_CONFIG.base_url, token)
    }

    /// Create a client with an explicit HTTP client.
    pub fn with_client(
        client: Arc<Client>,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Base URL this client targets
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn listing_url(&self) -> String {
        format!("{}{}", self.base_url, NEWS_API_CONFIG.news_endpoint)
    }
}

#[async_trait]
impl PageFetcher for NewsHttpClient {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<Vec<Story>> {
        if request.page_size == 0 {
            return Err(FetcherError::InvalidRequest(
                "page size must be at least 1".to_string(),
            ));
        }

        let url = self.listing_url();
        let mut params = request.query_params();
        params.push((NEWS_API_CONFIG.token_param, self.token.clone()));

        debug!(
            date = %request.date,
            page = request.page,
            "Requesting news page"
        );

        let metrics = PageRequestMetrics::start(NEWS_API_CONFIG.news_endpoint);
        let response = match self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&params)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                metrics.record_network_error();
                // reqwest errors can echo the full URL, which carries the token
                return Err(FetcherError::NetworkError(e.without_url().to_string()));
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::NetworkError(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(FetcherError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            });
        }

        let stories: Vec<Story> = serde_json::from_str(&body)
            .map_err(|e| FetcherError::ParseError(format!("Failed to decode stories: {e}")))?;

        debug!(
            date = %request.date,
            page = request.page,
            stories = stories.len(),
            "Received news page"
        );

        Ok(stories)
    }

    fn endpoint_url(&self, request: &PageRequest) -> String {
        let query = request
            .query_params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.listing_url(), query)
    }
}
