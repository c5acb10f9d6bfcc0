use crate::ingest::types::PriceBar;
use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use yahoo_finance_api as yahoo;

/// Price series the evaluation consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSpec {
    /// Last three completed daily bars.
    RecentDaily,
    /// Current session in two-minute bars.
    Intraday,
    /// One month of hourly bars, input to the technical indicators.
    IndicatorHistory,
}

impl SeriesSpec {
    fn interval(&self) -> &'static str {
        match self {
            SeriesSpec::RecentDaily => "1d",
            SeriesSpec::Intraday => "2m",
            SeriesSpec::IndicatorHistory => "1h",
        }
    }

    fn range(&self) -> &'static str {
        match self {
            SeriesSpec::RecentDaily => "5d",
            SeriesSpec::Intraday => "1d",
            SeriesSpec::IndicatorHistory => "1mo",
        }
    }

    fn keep_last(&self) -> Option<usize> {
        match self {
            SeriesSpec::RecentDaily => Some(3),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn bars(&self, ticker: &str, spec: SeriesSpec) -> Result<Vec<PriceBar>>;
}

pub struct YahooMarketData {
    connector: yahoo::YahooConnector,
}

impl YahooMarketData {
    pub fn new() -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| anyhow::anyhow!("failed to build Yahoo connector: {e}"))?;
        Ok(Self { connector })
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooMarketData {
    async fn bars(&self, ticker: &str, spec: SeriesSpec) -> Result<Vec<PriceBar>> {
        let response = self
            .connector
            .get_quote_range(ticker, spec.interval(), spec.range())
            .await
            .map_err(|e| anyhow::anyhow!("Yahoo quote request failed for {ticker}: {e}"))?;
        let quotes = response
            .quotes()
            .map_err(|e| anyhow::anyhow!("Yahoo quote response unusable for {ticker}: {e}"))?;

        let bars: Vec<PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let timestamp = DateTime::<Utc>::from_timestamp(q.timestamp as i64, 0)?;
                Some(PriceBar {
                    timestamp,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume as u64,
                })
            })
            .collect();

        let bars = match spec.keep_last() {
            Some(n) => completed_daily_bars(bars, Utc::now(), n),
            None => bars,
        };

        tracing::debug!(ticker, ?spec, bars = bars.len(), "fetched price series");
        Ok(bars)
    }
}

/// Drops the bar of the session still in progress at `now` (exchange-local
/// date) and keeps the last `keep` of the rest.
fn completed_daily_bars(mut bars: Vec<PriceBar>, now: DateTime<Utc>, keep: usize) -> Vec<PriceBar> {
    let today = now.with_timezone(&New_York).date_naive();
    bars.retain(|bar| bar.timestamp.with_timezone(&New_York).date_naive() < today);
    let skip = bars.len().saturating_sub(keep);
    bars.drain(..skip);
    bars
}

/// Markdown table, one row per bar.
pub fn format_bars_markdown(bars: &[PriceBar]) -> String {
    if bars.is_empty() {
        return "No price data available.".to_string();
    }

    let mut out = String::from(
        "| Datetime | Open | High | Low | Close | Volume |\n|:--|--:|--:|--:|--:|--:|\n",
    );
    for bar in bars {
        out.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {} |\n",
            bar.timestamp.format("%Y-%m-%d %H:%M"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn markdown_has_header_and_one_row_per_bar() {
        let bars = vec![PriceBar {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 5, 14, 30, 0).unwrap(),
            open: 100.0,
            high: 101.5,
            low: 99.25,
            close: 101.0,
            volume: 1200,
        }];
        let table = format_bars_markdown(&bars);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "| 2026-01-05 14:30 | 100.00 | 101.50 | 99.25 | 101.00 | 1200 |");
    }

    fn daily(day: u32) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2026, 3, day, 13, 30, 0).unwrap(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1000,
        }
    }

    #[test]
    fn recent_daily_excludes_current_session() {
        // Mon 2026-03-09 .. Fri 2026-03-13; now is Friday 15:00 EDT.
        let bars: Vec<_> = (9..=13).map(daily).collect();
        let now = Utc.with_ymd_and_hms(2026, 3, 13, 19, 0, 0).unwrap();
        let kept = completed_daily_bars(bars, now, 3);
        let days: Vec<_> = kept.iter().map(|b| b.timestamp.format("%d").to_string()).collect();
        assert_eq!(days, vec!["10", "11", "12"]);
    }

    #[test]
    fn recent_daily_uses_new_york_date() {
        // 2026-03-14 01:00 UTC is still Friday evening in New York.
        let bars: Vec<_> = (9..=13).map(daily).collect();
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 1, 0, 0).unwrap();
        let kept = completed_daily_bars(bars, now, 3);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].timestamp.format("%d").to_string(), "12");

        let now = Utc.with_ymd_and_hms(2026, 3, 16, 14, 0, 0).unwrap();
        let kept = completed_daily_bars((9..=13).map(daily).collect(), now, 3);
        assert_eq!(kept[2].timestamp.format("%d").to_string(), "13");
    }

    #[test]
    fn empty_series_is_explicit() {
        assert_eq!(format_bars_markdown(&[]), "No price data available.");
    }
}
