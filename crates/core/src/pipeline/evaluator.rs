use crate::analysis::analyst::{AnalystSection, FinancialAnalyst};
use crate::analysis::indicators::{compute_indicators, format_indicators};
use crate::config::Settings;
use crate::domain::profile::UserProfile;
use crate::domain::ticker::TickerTable;
use crate::ingest::market::{format_bars_markdown, MarketDataProvider, SeriesSpec, YahooMarketData};
use crate::ingest::news::{NewsAggregator, YahooNewsSource};
use crate::ingest::page::HttpPageFetcher;
use crate::ingest::search::{BingWebSearch, WebSearchEvaluator};
use crate::ingest::sentiment::{AlphaVantageSentiment, SentimentScorer};
use crate::llm::{CompletionRequest, LlmClient};
use crate::pipeline::context::ContextBuilder;
use crate::pipeline::options::EvaluationOptions;
use crate::pipeline::prompt::system_instruction;
use crate::storage::positions::{JsonFilePositionStore, PositionStore};
use crate::time::market::MarketCalendar;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Raw model reply plus the exact context it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub ticker: String,
    pub company_name: String,
    pub response: String,
    pub context: String,
}

/// Everything the evaluator talks to, constructed once per process.
pub struct EvaluatorDeps {
    pub tickers: Arc<TickerTable>,
    pub llm: Arc<dyn LlmClient>,
    pub market: Arc<dyn MarketDataProvider>,
    pub news: Arc<NewsAggregator>,
    pub search: Arc<WebSearchEvaluator>,
    pub sentiment: Option<Arc<SentimentScorer>>,
    pub analyst: Arc<FinancialAnalyst>,
    pub profile: UserProfile,
    pub calendar: MarketCalendar,
    pub positions: Arc<dyn PositionStore>,
    pub options: EvaluationOptions,
}

pub struct Evaluator {
    deps: EvaluatorDeps,
}

impl Evaluator {
    pub fn new(deps: EvaluatorDeps) -> Self {
        Self { deps }
    }

    /// Wires the production collaborators from configuration.
    pub fn from_settings(
        settings: &Settings,
        llm: Arc<dyn LlmClient>,
        options: EvaluationOptions,
    ) -> anyhow::Result<Self> {
        let tickers = Arc::new(TickerTable::load(&settings.ticker_db_path)?);
        let profile = UserProfile::load(&settings.user_info_path)?;
        let calendar = MarketCalendar::from_env()?;

        let http = crate::ingest::http_client()?;
        let pages = Arc::new(HttpPageFetcher::new(http.clone()));
        let news = Arc::new(NewsAggregator::new(
            Arc::new(YahooNewsSource::new(http.clone())),
            pages.clone(),
            options.news_articles,
        ));
        let search = Arc::new(WebSearchEvaluator::new(
            Arc::new(BingWebSearch::new(http.clone(), settings.require_bing_search_key()?)),
            pages,
            options.search_results,
        ));
        let sentiment = if options.include_sentiment {
            let source = AlphaVantageSentiment::new(http, settings.require_alpha_vantage_api_key()?);
            Some(Arc::new(SentimentScorer::new(
                Arc::new(source),
                options.sentiment_threshold,
            )))
        } else {
            None
        };
        let analyst = Arc::new(FinancialAnalyst::new(llm.clone(), options.analyst_model.clone()));

        Ok(Self::new(EvaluatorDeps {
            tickers,
            llm,
            market: Arc::new(YahooMarketData::new()?),
            news,
            search,
            sentiment,
            analyst,
            profile,
            calendar,
            positions: Arc::new(JsonFilePositionStore::new(settings.positions_dir.clone())),
            options,
        }))
    }

    pub fn tickers(&self) -> &TickerTable {
        &self.deps.tickers
    }

    pub fn calendar(&self) -> &MarketCalendar {
        &self.deps.calendar
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.deps.options
    }

    pub async fn evaluate(&self, ticker: &str, directive: Option<&str>) -> anyhow::Result<Evaluation> {
        self.evaluate_at(ticker, directive, Utc::now()).await
    }

    /// Any collaborator failure fails the whole evaluation. An unknown ticker
    /// fails before anything external is called.
    pub async fn evaluate_at(
        &self,
        ticker: &str,
        directive: Option<&str>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Evaluation> {
        let d = &self.deps;
        let company_name = d.tickers.company_name(ticker)?.to_string();
        let t0 = std::time::Instant::now();

        let web_raw = d
            .search
            .research(&company_name)
            .await
            .with_context(|| format!("web search failed for {ticker}"))?;
        let market_raw = d.news.market_news().await.context("market news failed")?;
        let stock_raw = d
            .news
            .stock_news(ticker)
            .await
            .with_context(|| format!("stock news failed for {ticker}"))?;
        let sentiment = match &d.sentiment {
            Some(scorer) => Some(
                scorer
                    .evaluate(ticker)
                    .await
                    .with_context(|| format!("sentiment failed for {ticker}"))?,
            ),
            None => None,
        };

        let hourly = d
            .market
            .bars(ticker, SeriesSpec::IndicatorHistory)
            .await
            .with_context(|| format!("indicator history failed for {ticker}"))?;
        let indicators_raw = format_indicators(&compute_indicators(&hourly)?);

        let (web, market_news, stock_news, indicators) = if d.options.summarize_sections {
            (
                self.summarize(AnalystSection::WebSearch, &company_name, ticker, &web_raw).await?,
                self.summarize(AnalystSection::MarketNews, &company_name, ticker, &market_raw).await?,
                self.summarize(AnalystSection::StockNews, &company_name, ticker, &stock_raw).await?,
                self.summarize(AnalystSection::TechnicalIndicators, &company_name, ticker, &indicators_raw)
                    .await?,
            )
        } else {
            (web_raw, market_raw, stock_raw, indicators_raw)
        };

        let session = d.calendar.session_at(now)?;
        let user_data = d
            .profile
            .render(now.with_timezone(&d.calendar.trading_tz), &session);

        let recent = d
            .market
            .bars(ticker, SeriesSpec::RecentDaily)
            .await
            .with_context(|| format!("daily bars failed for {ticker}"))?;
        let intraday = d
            .market
            .bars(ticker, SeriesSpec::Intraday)
            .await
            .with_context(|| format!("intraday bars failed for {ticker}"))?;

        let position = d
            .positions
            .load_or_init(ticker)
            .await
            .with_context(|| format!("position lookup failed for {ticker}"))?;

        let context = ContextBuilder::new()
            .section("General News About the Company", web)
            .section("General Financial Market Condition", market_news)
            .section("Recent News About the Stock", stock_news)
            .optional_section("Sentiment Analysis", sentiment)
            .section("Technical Indicators", indicators)
            .section("User Data", user_data)
            .section("Three-Day Stock Data", format_bars_markdown(&recent))
            .section("Minute-by-Minute Stock Data", format_bars_markdown(&intraday))
            .section(
                format!("Current purchased derivative on {company_name} ({ticker})"),
                position.describe(d.options.position_text),
            )
            .optional_section(
                "User Trading Goal",
                directive
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            )
            .build()
            .into_text();

        let req = CompletionRequest::new(system_instruction(&company_name, ticker), context.clone())
            .with_model(d.options.decision_model.clone());
        let response = d
            .llm
            .complete(req)
            .await
            .with_context(|| format!("decision model call failed for {ticker}"))?;

        tracing::info!(
            ticker,
            provider = d.llm.provider().as_str(),
            context_len = context.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "evaluation complete"
        );

        Ok(Evaluation {
            ticker: ticker.to_string(),
            company_name,
            response,
            context,
        })
    }

    async fn summarize(
        &self,
        section: AnalystSection,
        company_name: &str,
        ticker: &str,
        raw: &str,
    ) -> anyhow::Result<String> {
        self.deps
            .analyst
            .summarize(section, company_name, ticker, raw)
            .await
    }
}
