use crate::time::market::MarketSession;
use anyhow::Context;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Read-only description of the trader the advice is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_location: String,
    pub available_budget: serde_json::Value,
    pub trading_currency: String,
    #[serde(default)]
    pub trading_tickers: Vec<String>,
    pub trading_market_location: String,
    pub risk_tolerance_description: String,
}

impl UserProfile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read user profile {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse user profile {}", path.display()))
    }

    fn budget(&self) -> String {
        match &self.available_budget {
            serde_json::Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }

    /// Profile section of the evaluation context. `now` is in the user's
    /// trading timezone.
    pub fn render(&self, now: DateTime<Tz>, session: &MarketSession) -> String {
        format!(
            "User Location: {}\n\
             Available Budget: {} {}\n\
             Trading Tickers: {}\n\
             Trading Market Location: {}\n\
             Risk Tolerance: {}\n\
             Current Time of the User: {}\n\
             US Market Session: {}",
            self.user_location,
            self.budget(),
            self.trading_currency,
            self.trading_tickers.join(", "),
            self.trading_market_location,
            self.risk_tolerance_description,
            now.format("%Y-%m-%d %H:%M:%S %Z"),
            session,
        )
    }
}
