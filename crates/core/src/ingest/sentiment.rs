use crate::ingest::types::{ScoredLabel, SentimentRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.55;

/// One article of the Alpha Vantage `NEWS_SENTIMENT` feed. Ticker and topic
/// scores arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedArticle {
    pub title: String,
    #[serde(default)]
    pub time_published: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub overall_sentiment_score: f64,
    #[serde(default)]
    pub overall_sentiment_label: String,
    #[serde(default)]
    pub ticker_sentiment: Vec<FeedTickerSentiment>,
    #[serde(default)]
    pub topics: Vec<FeedTopic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedTickerSentiment {
    pub ticker: String,
    pub relevance_score: String,
    pub ticker_sentiment_score: String,
    pub ticker_sentiment_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedTopic {
    pub topic: String,
    pub relevance_score: String,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feed: Vec<FeedArticle>,
}

#[async_trait::async_trait]
pub trait SentimentSource: Send + Sync {
    async fn feed(&self, ticker: &str) -> Result<Vec<FeedArticle>>;
}

#[derive(Debug, Clone)]
pub struct AlphaVantageSentiment {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageSentiment {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        let base_url = std::env::var("ALPHA_VANTAGE_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            http,
            api_key: api_key.into(),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl SentimentSource for AlphaVantageSentiment {
    async fn feed(&self, ticker: &str) -> Result<Vec<FeedArticle>> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("tickers", ticker),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("sentiment request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read sentiment response")?;
        if !status.is_success() {
            anyhow::bail!("sentiment HTTP {status}: {text}");
        }

        let raw = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("sentiment response is not valid JSON: {text}"))?;
        // Quota and key problems come back as 200 with a message instead of a feed.
        for key in ["Error Message", "Information", "Note"] {
            if let Some(msg) = raw.get(key) {
                anyhow::bail!("sentiment API refused request: {msg}");
            }
        }

        let parsed = serde_json::from_value::<FeedResponse>(raw)
            .context("failed to decode sentiment feed")?;
        Ok(parsed.feed)
    }
}

/// Keeps articles whose relevance to `ticker` is at least `threshold`, in
/// feed order. Articles with malformed scores are skipped.
pub fn select_records(feed: &[FeedArticle], ticker: &str, threshold: f64) -> Vec<SentimentRecord> {
    feed.iter()
        .filter_map(|article| match to_record(article, ticker) {
            Ok(Some(record)) if record.ticker_relevance >= threshold => Some(record),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(title = %article.title, error = %err, "skipping sentiment article");
                None
            }
        })
        .collect()
}

fn to_record(article: &FeedArticle, ticker: &str) -> Result<Option<SentimentRecord>> {
    let Some(ts) = article.ticker_sentiment.iter().find(|t| t.ticker == ticker) else {
        return Ok(None);
    };

    let ticker_relevance = parse_score(&ts.relevance_score, "relevance_score")?;
    let ticker_score = parse_score(&ts.ticker_sentiment_score, "ticker_sentiment_score")?;
    let topic_relevance = article
        .topics
        .iter()
        .map(|t| Ok((t.topic.clone(), parse_score(&t.relevance_score, "topic relevance_score")?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(SentimentRecord {
        title: article.title.clone(),
        timestamp: article.time_published.clone(),
        authors: article.authors.clone(),
        summary: article.summary.clone(),
        overall_sentiment: ScoredLabel {
            score: article.overall_sentiment_score,
            label: article.overall_sentiment_label.clone(),
        },
        ticker_relevance,
        ticker_sentiment: ScoredLabel {
            score: ticker_score,
            label: ts.ticker_sentiment_label.clone(),
        },
        topic_relevance,
    }))
}

fn parse_score(s: &str, field: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .with_context(|| format!("{field} is not numeric: {s:?}"))
}

pub fn format_records(records: &[SentimentRecord]) -> String {
    if records.is_empty() {
        return "No sufficiently relevant sentiment data available.".to_string();
    }

    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "\nTitle: {}\nTime Published: {}\nAuthor: {}\nSummary: {}\n",
            r.title,
            r.timestamp,
            r.authors.join(", "),
            r.summary
        ));
        out.push_str(&format!(
            "Overall Sentiment: Score={:.3}, Label={}\n",
            r.overall_sentiment.score, r.overall_sentiment.label
        ));
        out.push_str(&format!(
            "\nTicker Sentiment:\nSentiment Score={:.3}, Label={}, Relevance={:.3}\n",
            r.ticker_sentiment.score, r.ticker_sentiment.label, r.ticker_relevance
        ));
        if !r.topic_relevance.is_empty() {
            out.push_str("\nTopic Relevance Scores:\n");
            for (topic, score) in &r.topic_relevance {
                out.push_str(&format!("- {topic}: {score:.3}\n"));
            }
        }
        out.push_str(&"-".repeat(80));
        out.push('\n');
    }
    out
}

pub struct SentimentScorer {
    source: Arc<dyn SentimentSource>,
    threshold: f64,
}

impl SentimentScorer {
    pub fn new(source: Arc<dyn SentimentSource>, threshold: f64) -> Self {
        Self { source, threshold }
    }

    pub async fn evaluate(&self, ticker: &str) -> Result<String> {
        let feed = self.source.feed(ticker).await?;
        let records = select_records(&feed, ticker, self.threshold);
        tracing::debug!(ticker, feed = feed.len(), kept = records.len(), "sentiment filtered");
        Ok(format_records(&records))
    }
}
