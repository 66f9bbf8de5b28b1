use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};
use std::time::Duration;

fn timeout_from_env(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn builder() -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(timeout_from_env("HTTP_TIMEOUT_SECS", 10))
        .connect_timeout(timeout_from_env("HTTP_CONNECT_TIMEOUT_SECS", 5))
}

/// Client for JSON APIs.
pub fn build_client() -> Client {
    builder().build().unwrap_or_else(|_| Client::new())
}

/// Client that presents itself as a mobile browser, for catalog pages.
pub fn build_browser_client() -> Client {
    builder()
        .default_headers(browser_headers())
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
        ),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}
