//! REST page fetchers

use crate::{DisplayOutput, SortDirection, SortField, Story};
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod news_config;
pub mod news_http;
pub mod pagination;
pub mod shared_resources;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Transport-level failure (DNS, connect, timeout, broken body)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status, with the raw response body
    #[error("unexpected response: status {status}: {body}")]
    UnexpectedResponse {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Response body did not decode into stories
    #[error("parse error: {0}")]
    ParseError(String),

    /// Request parameters rejected before sending
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Parameters for fetching one page of one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Calendar day being exported
    pub date: NaiveDate,
    /// Zero-based page index
    pub page: u32,
    /// Maximum stories per page
    pub page_size: u32,
    /// Sort field
    pub sort_field: SortField,
    /// Sort direction
    pub sort_direction: SortDirection,
    /// Requested detail level
    pub display: DisplayOutput,
}

impl PageRequest {
    /// First page for `date` using default sort and detail settings.
    pub fn first(date: NaiveDate, page_size: u32) -> Self {
        Self {
            date,
            page: 0,
            page_size,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            display: DisplayOutput::default(),
        }
    }

    /// Same request pointed at another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Query parameters for this page, excluding authentication.
    ///
    /// `page` is omitted for the first page.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("date", self.date.format("%Y-%m-%d").to_string()),
            ("pageSize", self.page_size.to_string()),
            (
                "sort",
                format!("{}:{}", self.sort_field, self.sort_direction),
            ),
            ("displayOutput", self.display.to_string()),
        ];
        if self.page > 0 {
            params.push(("page", self.page.to_string()));
        }
        params
    }
}

/// Source of story pages for one day
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page. No retries happen at this layer.
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<Vec<Story>>;

    /// URL used for `request`, for error context. Must not contain credentials.
    fn endpoint_url(&self, request: &PageRequest) -> String;
}
