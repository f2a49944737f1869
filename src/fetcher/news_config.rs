//! News API endpoint configuration
//!
//! Endpoint locations are plain configuration so tests and alternate
//! deployments can swap hosts without touching the clients.

/// Endpoint set for one news API deployment
#[derive(Debug, Clone)]
pub struct NewsApiConfig {
    /// Base URL for REST calls (e.g., <https://api.benzinga.com>)
    pub base_url: &'static str,

    /// Day-filtered story listing path
    pub news_endpoint: &'static str,

    /// Websocket URL for the live story stream
    pub stream_url: &'static str,

    /// Query parameter carrying the API token on both channels
    pub token_param: &'static str,
}

/// Production deployment
pub const NEWS_API_CONFIG: NewsApiConfig = NewsApiConfig {
    base_url: "https://api.benzinga.com",
    news_endpoint: "/api/v2/news",
    stream_url: "wss://api.benzinga.com/api/v1/news/stream",
    token_param: "token",
};

/// Support text printed by the `info` command
pub const SUPPORT_INFO: &str =
    "For Support Content licensing@benzinga.com or see https://github.com/Benzinga/sdk-go";
