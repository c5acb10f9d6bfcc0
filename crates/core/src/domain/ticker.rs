use anyhow::Context;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Static ticker -> company display name mapping, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TickerTable {
    names: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTickerError {
    pub ticker: String,
}

impl fmt::Display for UnknownTickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticker {} is not in the lookup table", self.ticker)
    }
}

impl std::error::Error for UnknownTickerError {}

impl TickerTable {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ticker table {}", path.display()))?;
        let names = serde_json::from_str::<BTreeMap<String, String>>(&text)
            .with_context(|| format!("ticker table {} is not a JSON object", path.display()))?;
        Ok(Self::from_map(names))
    }

    pub fn from_map(names: BTreeMap<String, String>) -> Self {
        let names = names
            .into_iter()
            .map(|(ticker, name)| (ticker.trim().to_string(), name.trim().to_string()))
            .filter(|(ticker, _)| !ticker.is_empty())
            .collect();
        Self { names }
    }

    pub fn company_name(&self, ticker: &str) -> Result<&str, UnknownTickerError> {
        self.names
            .get(ticker)
            .map(String::as_str)
            .ok_or_else(|| UnknownTickerError {
                ticker: ticker.to_string(),
            })
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}
