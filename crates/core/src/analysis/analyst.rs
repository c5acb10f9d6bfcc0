use crate::llm::{CompletionRequest, LlmClient};
use anyhow::Context;
use std::sync::Arc;

/// Context sections that an analyst pass can condense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalystSection {
    WebSearch,
    MarketNews,
    StockNews,
    TechnicalIndicators,
}

impl AnalystSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalystSection::WebSearch => "web_search",
            AnalystSection::MarketNews => "market_news",
            AnalystSection::StockNews => "stock_news",
            AnalystSection::TechnicalIndicators => "technical_indicators",
        }
    }

    pub fn instruction(&self, company_name: &str, ticker: &str) -> String {
        let focus = match self {
            AnalystSection::WebSearch => format!(
                "Analyze the provided web search results about {company_name} ({ticker}), which include recent news, price movements, analyst ratings and other financial data. Combine them with historical events you know of, and avoid relying on outdated or irrelevant details."
            ),
            AnalystSection::MarketNews => "Analyze the provided general financial market news. Describe the overall market condition today, the macroeconomic drivers behind it and the sectors most affected.".to_string(),
            AnalystSection::StockNews => format!(
                "Analyze the provided news articles about {company_name} ({ticker}). Separate actionable, recent information from speculation and stale coverage."
            ),
            AnalystSection::TechnicalIndicators => format!(
                "Analyze the provided hourly technical indicators (RSI, SMA, EMA, Bollinger Bands, VWAP, ATR) for {company_name} ({ticker}). Identify the current trend, momentum, volatility and key support and resistance levels."
            ),
        };

        format!(
            "You are a financial analyst with years of experience evaluating the {company_name} ({ticker}) stock for potential day trading. {focus}\n\n\
             Provide:\n\
             1. A **summary** of the key information influencing short-term price movements.\n\
             2. Your **opinion** on whether to pursue day trading this stock today, with reasoning.\n\
             3. Specific **guidance** on how to proceed, including strategies or conditions to watch for.\n\n\
             Be concise and ensure your analysis is focused, actionable, and cautious of risks."
        )
    }
}

/// Condenses raw provider text with a cheaper model before it reaches the
/// decision prompt.
pub struct FinancialAnalyst {
    llm: Arc<dyn LlmClient>,
    model: Option<String>,
}

impl FinancialAnalyst {
    pub fn new(llm: Arc<dyn LlmClient>, model: Option<String>) -> Self {
        Self { llm, model }
    }

    pub async fn summarize(
        &self,
        section: AnalystSection,
        company_name: &str,
        ticker: &str,
        raw: &str,
    ) -> anyhow::Result<String> {
        let t0 = std::time::Instant::now();
        let req = CompletionRequest::new(section.instruction(company_name, ticker), raw)
            .with_model(self.model.clone());
        let out = self
            .llm
            .complete(req)
            .await
            .with_context(|| format!("analyst summary failed: section={}", section.as_str()))?;
        tracing::debug!(
            ticker,
            section = section.as_str(),
            elapsed_ms = t0.elapsed().as_millis(),
            "analyst summary ready"
        );
        Ok(out)
    }
}
