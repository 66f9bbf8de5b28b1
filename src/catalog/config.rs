use once_cell::sync::Lazy;
use std::{env, time::Duration};

pub const DEFAULT_SEARCH_URL: &str = "https://www.deloox.se/api/search";

pub static SEARCH_URL: Lazy<String> = Lazy::new(|| {
    env::var("CATALOG_SEARCH_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string())
});

/// Pause after each scraped row.
pub static SCRAPE_DELAY: Lazy<Duration> = Lazy::new(|| {
    let millis = env::var("SCRAPE_DELAY_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1000);
    Duration::from_millis(millis)
});
