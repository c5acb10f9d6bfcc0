use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Article reference as listed by a news feed, before its page is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub link: String,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
    pub full_text: String,
}

impl NewsItem {
    pub fn from_headline(headline: Headline, full_text: String) -> Self {
        Self {
            title: headline.title,
            link: headline.link,
            publisher: headline.publisher,
            published_at: headline.published_at,
            full_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub score: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub title: String,
    pub timestamp: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub overall_sentiment: ScoredLabel,
    pub ticker_relevance: f64,
    pub ticker_sentiment: ScoredLabel,
    pub topic_relevance: Vec<(String, f64)>,
}
