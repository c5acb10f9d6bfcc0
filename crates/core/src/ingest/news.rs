use crate::ingest::page::PageFetcher;
use crate::ingest::types::{Headline, NewsItem};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Symbol whose news stands in for the broad market.
pub const MARKET_SYMBOL: &str = "^GSPC";

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn headlines(&self, symbol: &str, count: usize) -> Result<Vec<Headline>>;
}

#[derive(Debug, Clone)]
pub struct YahooNewsSource {
    http: reqwest::Client,
    base_url: String,
}

impl YahooNewsSource {
    pub fn new(http: reqwest::Client) -> Self {
        let base_url = std::env::var("YAHOO_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_YAHOO_BASE_URL.to_string());
        Self { http, base_url }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<YahooNewsEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooNewsEntry {
    title: String,
    link: String,
    #[serde(default)]
    publisher: String,
    provider_publish_time: i64,
}

#[async_trait::async_trait]
impl NewsSource for YahooNewsSource {
    async fn headlines(&self, symbol: &str, count: usize) -> Result<Vec<Headline>> {
        let url = format!("{}/v1/finance/search", self.base_url.trim_end_matches('/'));
        let news_count = count.to_string();
        let res = self
            .http
            .get(url)
            .query(&[
                ("q", symbol),
                ("quotesCount", "0"),
                ("newsCount", news_count.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Yahoo news request failed for {symbol}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Yahoo news response")?;
        if !status.is_success() {
            anyhow::bail!("Yahoo news HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<SearchResponse>(&text)
            .with_context(|| format!("Yahoo news response has unexpected shape: {text}"))?;

        Ok(parsed
            .news
            .into_iter()
            .take(count)
            .filter_map(|entry| {
                let published_at = DateTime::<Utc>::from_timestamp(entry.provider_publish_time, 0)?;
                Some(Headline {
                    title: entry.title,
                    link: entry.link,
                    publisher: entry.publisher,
                    published_at,
                })
            })
            .collect())
    }
}

/// Merges `fresh` into `existing`: link-identity dedup, newest first, at most
/// `cap` items. Returns whether anything new was added.
pub fn merge_news(existing: &mut Vec<NewsItem>, fresh: Vec<NewsItem>, cap: usize) -> bool {
    let mut seen: HashSet<String> = existing.iter().map(|n| n.link.clone()).collect();
    let mut updated = false;
    for item in fresh {
        if seen.insert(item.link.clone()) {
            existing.push(item);
            updated = true;
        }
    }

    existing.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    existing.truncate(cap);
    updated
}

pub fn render_news(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return "No recent news available.".to_string();
    }

    items
        .iter()
        .map(|n| {
            format!(
                "\nTitle: {}\nPublisher: {}\nPublished at: {}\nContent: {}\n",
                n.title,
                n.publisher,
                n.published_at.format("%Y-%m-%d %H:%M:%S"),
                n.full_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-symbol news lists that persist for the lifetime of the process and
/// absorb new articles on every call.
pub struct NewsAggregator {
    source: Arc<dyn NewsSource>,
    pages: Arc<dyn PageFetcher>,
    num_articles: usize,
    cache: tokio::sync::Mutex<HashMap<String, Vec<NewsItem>>>,
}

impl NewsAggregator {
    pub fn new(source: Arc<dyn NewsSource>, pages: Arc<dyn PageFetcher>, num_articles: usize) -> Self {
        Self {
            source,
            pages,
            num_articles: num_articles.max(1),
            cache: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn latest(&self, symbol: &str) -> Result<Vec<NewsItem>> {
        let headlines = self.source.headlines(symbol, self.num_articles).await?;

        let known: HashSet<String> = {
            let cache = self.cache.lock().await;
            cache
                .get(symbol)
                .map(|items| items.iter().map(|n| n.link.clone()).collect())
                .unwrap_or_default()
        };

        let mut fresh = Vec::new();
        for headline in headlines {
            if known.contains(&headline.link) || fresh.iter().any(|n: &NewsItem| n.link == headline.link) {
                continue;
            }
            let full_text = match self.pages.fetch_text(&headline.link).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(symbol, link = %headline.link, error = %err, "article fetch failed");
                    format!("Failed to retrieve the article content: {err}")
                }
            };
            fresh.push(NewsItem::from_headline(headline, full_text));
        }

        let mut cache = self.cache.lock().await;
        let items = cache.entry(symbol.to_string()).or_default();
        let updated = merge_news(items, fresh, self.num_articles);
        tracing::debug!(symbol, updated, items = items.len(), "news cache merged");
        Ok(items.clone())
    }

    pub async fn stock_news(&self, ticker: &str) -> Result<String> {
        Ok(render_news(&self.latest(ticker).await?))
    }

    pub async fn market_news(&self) -> Result<String> {
        Ok(render_news(&self.latest(MARKET_SYMBOL).await?))
    }
}
