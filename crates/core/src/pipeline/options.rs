use crate::domain::position::PositionTextMode;
use crate::ingest::sentiment::DEFAULT_RELEVANCE_THRESHOLD;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOptions {
    pub news_articles: usize,
    pub search_results: usize,
    pub sentiment_threshold: f64,
    /// Off by default: the model leaned on sentiment far more than on price action.
    pub include_sentiment: bool,
    pub summarize_sections: bool,
    pub position_text: PositionTextMode,
    pub batch_delay: Duration,
    pub decision_model: Option<String>,
    pub analyst_model: Option<String>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            news_articles: 5,
            search_results: 7,
            sentiment_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            include_sentiment: false,
            summarize_sections: true,
            position_text: PositionTextMode::default(),
            batch_delay: Duration::from_secs(10),
            decision_model: None,
            analyst_model: None,
        }
    }
}

impl EvaluationOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();
        let position_text = match non_empty("POSITION_TEXT") {
            None => d.position_text,
            Some(s) => PositionTextMode::parse(&s)
                .ok_or_else(|| anyhow::anyhow!("POSITION_TEXT must be describe or legacy (got {s})"))?,
        };

        Ok(Self {
            news_articles: parsed("NEWS_ARTICLES")?.unwrap_or(d.news_articles),
            search_results: parsed("SEARCH_RESULTS")?.unwrap_or(d.search_results),
            sentiment_threshold: parsed("SENTIMENT_RELEVANCE_THRESHOLD")?.unwrap_or(d.sentiment_threshold),
            include_sentiment: flag("INCLUDE_SENTIMENT")?.unwrap_or(d.include_sentiment),
            summarize_sections: flag("SUMMARIZE_SECTIONS")?.unwrap_or(d.summarize_sections),
            position_text,
            batch_delay: parsed::<u64>("BATCH_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(d.batch_delay),
            decision_model: non_empty("DECISION_MODEL"),
            analyst_model: non_empty("ANALYST_MODEL"),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    non_empty(key)
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} is invalid ({s}): {e}"))
        })
        .transpose()
}

fn flag(key: &str) -> anyhow::Result<Option<bool>> {
    non_empty(key).map(|s| parse_flag(key, &s)).transpose()
}

fn parse_flag(key: &str, s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be a boolean (got {s})"),
    }
}
