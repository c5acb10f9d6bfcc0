//! In-process fakes for every collaborator of the evaluation pipeline.

use crate::analysis::analyst::FinancialAnalyst;
use crate::domain::position::UserPosition;
use crate::domain::profile::UserProfile;
use crate::domain::ticker::TickerTable;
use crate::ingest::market::{MarketDataProvider, SeriesSpec};
use crate::ingest::news::{NewsAggregator, NewsSource};
use crate::ingest::page::PageFetcher;
use crate::ingest::search::{WebSearch, WebSearchEvaluator};
use crate::ingest::sentiment::{FeedArticle, SentimentScorer, SentimentSource};
use crate::ingest::types::{Headline, PriceBar, SearchHit};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{CompletionRequest, LlmClient, Provider};
use crate::notify::{Notification, Notifier, NotifyOutcome};
use crate::pipeline::evaluator::{Evaluator, EvaluatorDeps};
use crate::pipeline::options::EvaluationOptions;
use crate::storage::positions::PositionStore;
use crate::time::market::MarketCalendar;
use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn http_error(status: u16) -> anyhow::Error {
    LlmDiagnosticsError {
        provider: Provider::OpenAI,
        stage: "http",
        status: Some(status),
        detail: format!("status={status}"),
        raw_output: None,
    }
    .into()
}

#[derive(Default)]
pub struct FakeLlm {
    script: Mutex<VecDeque<Result<String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl FakeLlm {
    /// Replies in order; errors once the script runs out.
    pub fn scripted(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Same reply to every request.
    pub fn replying(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, req: CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| anyhow::anyhow!("fake LLM script exhausted"))
    }
}

/// Headlines for the given links; later links are newer.
pub struct FakeNews {
    links: Vec<String>,
    calls: AtomicUsize,
}

impl FakeNews {
    pub fn with_links(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NewsSource for FakeNews {
    async fn headlines(&self, symbol: &str, count: usize) -> Result<Vec<Headline>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let base = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        Ok(self
            .links
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, link)| Headline {
                title: format!("{symbol} headline {i}"),
                link: link.clone(),
                publisher: "Wire".to_string(),
                published_at: base + Duration::minutes(i as i64),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakePages {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakePages {
    pub fn failing_on(url: &str) -> Self {
        Self {
            failing: HashSet::from([url.to_string()]),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageFetcher for FakePages {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) {
            anyhow::bail!("connection reset fetching {url}");
        }
        Ok(format!("text of {url}"))
    }
}

#[derive(Default)]
pub struct FakeSearch {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with_hits(hits: &[(&str, &str)]) -> Self {
        Self {
            hits: hits
                .iter()
                .map(|(name, url)| SearchHit {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<String> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.hits.iter().take(count).cloned().collect())
    }
}

/// Steadily rising hourly bars; selected tickers fail.
#[derive(Default)]
pub struct FakeMarket {
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl FakeMarket {
    pub fn fail_for(&self, ticker: &str) {
        self.failing.lock().unwrap().insert(ticker.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FakeMarket {
    async fn bars(&self, ticker: &str, spec: SeriesSpec) -> Result<Vec<PriceBar>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(ticker) {
            anyhow::bail!("quote request failed for {ticker}");
        }
        let n = match spec {
            SeriesSpec::RecentDaily => 3,
            SeriesSpec::Intraday => 5,
            SeriesSpec::IndicatorHistory => 30,
        };
        let start = Utc.with_ymd_and_hms(2026, 1, 2, 14, 30, 0).unwrap();
        Ok((0..n)
            .map(|i| {
                let close = 180.0 + i as f64 * 0.5;
                PriceBar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close - 0.25,
                    high: close + 0.75,
                    low: close - 0.75,
                    close,
                    volume: 10_000 + i as u64,
                }
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeSentiment {
    calls: AtomicUsize,
}

impl FakeSentiment {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SentimentSource for FakeSentiment {
    async fn feed(&self, ticker: &str) -> Result<Vec<FeedArticle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let article = serde_json::json!({
            "title": format!("{ticker} beats estimates"),
            "time_published": "20260105T120000",
            "authors": ["Desk"],
            "summary": "Strong quarter.",
            "overall_sentiment_score": 0.4,
            "overall_sentiment_label": "Bullish",
            "ticker_sentiment": [
                {"ticker": ticker, "relevance_score": "0.9", "ticker_sentiment_score": "0.5", "ticker_sentiment_label": "Bullish"}
            ],
            "topics": [{"topic": "Earnings", "relevance_score": "1.0"}]
        });
        Ok(vec![serde_json::from_value(article)?])
    }
}

#[derive(Default)]
pub struct MemoryPositionStore {
    positions: Mutex<HashMap<String, UserPosition>>,
    writes: AtomicUsize,
}

impl MemoryPositionStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PositionStore for MemoryPositionStore {
    async fn load_or_init(&self, ticker: &str) -> Result<UserPosition> {
        let mut positions = self.positions.lock().unwrap();
        if let Some(p) = positions.get(ticker) {
            return Ok(p.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        let p = UserPosition::default();
        positions.insert(ticker.to_string(), p.clone());
        Ok(p)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail_with: Option<String>,
}

impl RecordingNotifier {
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyOutcome {
        self.sent.lock().unwrap().push(notification.clone());
        match &self.fail_with {
            Some(reason) => NotifyOutcome::Failed {
                reason: reason.clone(),
            },
            None => NotifyOutcome::Delivered,
        }
    }
}

pub fn ticker_table() -> TickerTable {
    TickerTable::from_map(BTreeMap::from([
        ("AAPL".to_string(), "Apple Inc.".to_string()),
        ("MSFT".to_string(), "Microsoft Corporation".to_string()),
        ("NVDA".to_string(), "NVIDIA Corporation".to_string()),
    ]))
}

pub fn user_profile() -> UserProfile {
    UserProfile {
        user_location: "Berlin, Germany".to_string(),
        available_budget: serde_json::json!(5000),
        trading_currency: "EUR".to_string(),
        trading_tickers: vec!["AAPL".to_string(), "NVDA".to_string()],
        trading_market_location: "US".to_string(),
        risk_tolerance_description: "Moderate".to_string(),
    }
}

/// Fully faked collaborator set with call counters.
pub struct Fixture {
    pub llm: Arc<FakeLlm>,
    pub news: Arc<FakeNews>,
    pub pages: Arc<FakePages>,
    pub search: Arc<FakeSearch>,
    pub market: Arc<FakeMarket>,
    pub sentiment: Arc<FakeSentiment>,
    pub positions: Arc<MemoryPositionStore>,
}

pub fn fixture(llm: FakeLlm) -> Fixture {
    Fixture {
        llm: Arc::new(llm),
        news: Arc::new(FakeNews::with_links(&["https://news/1", "https://news/2"])),
        pages: Arc::new(FakePages::default()),
        search: Arc::new(FakeSearch::with_hits(&[("Result", "https://web/1")])),
        market: Arc::new(FakeMarket::default()),
        sentiment: Arc::new(FakeSentiment::default()),
        positions: Arc::new(MemoryPositionStore::default()),
    }
}

impl Fixture {
    pub fn sentiment_scorer(&self) -> Arc<SentimentScorer> {
        Arc::new(SentimentScorer::new(self.sentiment.clone(), 0.55))
    }

    pub fn deps(&self, options: EvaluationOptions) -> EvaluatorDeps {
        EvaluatorDeps {
            tickers: Arc::new(ticker_table()),
            llm: self.llm.clone(),
            market: self.market.clone(),
            news: Arc::new(NewsAggregator::new(
                self.news.clone(),
                self.pages.clone(),
                options.news_articles,
            )),
            search: Arc::new(WebSearchEvaluator::new(
                self.search.clone(),
                self.pages.clone(),
                options.search_results,
            )),
            sentiment: None,
            analyst: Arc::new(FinancialAnalyst::new(self.llm.clone(), options.analyst_model.clone())),
            profile: user_profile(),
            calendar: MarketCalendar::default(),
            positions: self.positions.clone(),
            options,
        }
    }

    pub fn evaluator(&self, options: EvaluationOptions) -> Evaluator {
        Evaluator::new(self.deps(options))
    }

    /// Calls made to anything outside the process.
    pub fn external_calls(&self) -> usize {
        self.llm.calls()
            + self.news.calls()
            + self.pages.calls()
            + self.search.calls()
            + self.market.calls()
            + self.sentiment.calls()
    }
}
