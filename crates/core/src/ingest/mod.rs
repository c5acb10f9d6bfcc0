pub mod market;
pub mod news;
pub mod page;
pub mod search;
pub mod sentiment;
pub mod types;

use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Yahoo and most news sites reject requests without a browser-like agent.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Shared HTTP client for the data providers.
pub fn http_client() -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    let timeout_secs = std::env::var("DATA_PROVIDER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build data provider http client")
}
