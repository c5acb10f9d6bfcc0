use crate::ingest::page::PageFetcher;
use crate::ingest::types::SearchHit;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_BING_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

#[async_trait::async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Clone)]
pub struct BingWebSearch {
    http: reqwest::Client,
    endpoint: String,
    subscription_key: String,
}

impl BingWebSearch {
    pub fn new(http: reqwest::Client, subscription_key: impl Into<String>) -> Self {
        let endpoint = std::env::var("BING_SEARCH_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BING_ENDPOINT.to_string());
        Self {
            http,
            endpoint,
            subscription_key: subscription_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    #[serde(default)]
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[async_trait::async_trait]
impl WebSearch for BingWebSearch {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Ocp-Apim-Subscription-Key",
            HeaderValue::from_str(&self.subscription_key)?,
        );

        let count = count.to_string();
        let res = self
            .http
            .get(&self.endpoint)
            .headers(headers)
            .query(&[("q", query), ("count", count.as_str()), ("mkt", "en-US")])
            .send()
            .await
            .context("web search request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read web search response")?;
        if !status.is_success() {
            anyhow::bail!("web search HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<BingResponse>(&text)
            .with_context(|| format!("web search response has unexpected shape: {text}"))?;
        Ok(parsed.web_pages.map(|p| p.value).unwrap_or_default())
    }
}

/// Searches the web for recent coverage of a company and inlines the text of
/// each hit.
pub struct WebSearchEvaluator {
    search: Arc<dyn WebSearch>,
    pages: Arc<dyn PageFetcher>,
    num_results: usize,
}

impl WebSearchEvaluator {
    pub fn new(search: Arc<dyn WebSearch>, pages: Arc<dyn PageFetcher>, num_results: usize) -> Self {
        Self {
            search,
            pages,
            num_results: num_results.max(1),
        }
    }

    pub fn query_for(company_name: &str) -> String {
        format!(
            "latest stock news, earnings report, analyst ratings, recent price movements, short-term catalysts about '{company_name}'"
        )
    }

    pub async fn research(&self, company_name: &str) -> Result<String> {
        let query = Self::query_for(company_name);
        let hits = self.search.search(&query, self.num_results).await?;

        let mut sections = Vec::with_capacity(hits.len());
        for hit in hits.into_iter().take(self.num_results) {
            let content = match self.pages.fetch_text(&hit.url).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(url = %hit.url, error = %err, "search hit fetch failed");
                    format!("Failed to retrieve the article content: {err}")
                }
            };
            sections.push(format!("Websearch Title: {}\n{}", hit.name, content));
        }

        if sections.is_empty() {
            return Ok(format!("No web results found for {company_name}."));
        }
        Ok(sections.join("\n"))
    }
}
