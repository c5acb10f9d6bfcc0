use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Resolves an article or search hit to its readable text.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("page request failed: {url}"))?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("page HTTP {status}: {url}");
        }

        let html = res
            .text()
            .await
            .with_context(|| format!("failed to read page body: {url}"))?;
        Ok(extract_paragraphs(&html))
    }
}

/// Text of every `<p>` element, tags stripped, joined by single spaces.
pub fn extract_paragraphs(html: &str) -> String {
    static PARAGRAPH: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    static SPACE: OnceLock<Regex> = OnceLock::new();
    let paragraph = PARAGRAPH.get_or_init(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
    let tag = TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());
    let space = SPACE.get_or_init(|| Regex::new(r"\s+").unwrap());

    paragraph
        .captures_iter(html)
        .filter_map(|cap| {
            let inner = tag.replace_all(&cap[1], "");
            let text = decode_entities(space.replace_all(&inner, " ").trim());
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
