use crate::ingest::types::PriceBar;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, RelativeStrengthIndex,
    SimpleMovingAverage,
};
use ta::{DataItem, Next};

const RSI_PERIOD: usize = 14;
const MA_PERIOD: usize = 20;
const BB_STD: f64 = 2.0;
const ATR_PERIOD: usize = 14;

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const ATR_HIGH_VOLATILITY: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub rsi: f64,
    pub sma_20: f64,
    pub ema_20: f64,
    pub bb_lower: f64,
    pub bb_middle: f64,
    pub bb_upper: f64,
    pub vwap: f64,
    pub atr: f64,
}

/// RSI(14), SMA(20), EMA(20), Bollinger(20, 2), session-anchored VWAP and
/// ATR(14). Rows inside the 20-bar warm-up are dropped.
pub fn compute_indicators(bars: &[PriceBar]) -> Result<Vec<IndicatorRow>> {
    let ta_err = |e: ta::errors::TaError| anyhow::anyhow!("indicator setup failed: {e:?}");
    let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD).map_err(ta_err)?;
    let mut sma = SimpleMovingAverage::new(MA_PERIOD).map_err(ta_err)?;
    let mut ema = ExponentialMovingAverage::new(MA_PERIOD).map_err(ta_err)?;
    let mut bb = BollingerBands::new(MA_PERIOD, BB_STD).map_err(ta_err)?;
    let mut atr = AverageTrueRange::new(ATR_PERIOD).map_err(ta_err)?;

    let vwap = anchored_vwap(bars);
    let mut rows = Vec::with_capacity(bars.len().saturating_sub(MA_PERIOD - 1));

    for (idx, bar) in bars.iter().enumerate() {
        let item = data_item(bar)?;
        let rsi_v = rsi.next(bar.close);
        let sma_v = sma.next(bar.close);
        let ema_v = ema.next(bar.close);
        let bands = bb.next(bar.close);
        let atr_v = atr.next(&item);

        if idx + 1 < MA_PERIOD {
            continue;
        }

        rows.push(IndicatorRow {
            timestamp: bar.timestamp,
            close: bar.close,
            rsi: rsi_v,
            sma_20: sma_v,
            ema_20: ema_v,
            bb_lower: bands.lower,
            bb_middle: bands.average,
            bb_upper: bands.upper,
            vwap: vwap[idx],
            atr: atr_v,
        });
    }

    Ok(rows)
}

/// Cumulative typical-price VWAP, reset at each calendar day.
pub fn anchored_vwap(bars: &[PriceBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut day: Option<NaiveDate> = None;
    let mut pv = 0.0;
    let mut vol = 0.0;

    for bar in bars {
        let d = bar.timestamp.date_naive();
        if day != Some(d) {
            day = Some(d);
            pv = 0.0;
            vol = 0.0;
        }
        let typical = (bar.high + bar.low + bar.close) / 3.0;
        pv += typical * bar.volume as f64;
        vol += bar.volume as f64;
        out.push(if vol > 0.0 { pv / vol } else { typical });
    }
    out
}

// Quote feeds occasionally report a close outside [low, high]; widen the range
// so the bar passes validation.
fn data_item(bar: &PriceBar) -> Result<DataItem> {
    let high = bar.high.max(bar.open).max(bar.close);
    let low = bar.low.min(bar.open).min(bar.close);
    DataItem::builder()
        .open(bar.open)
        .high(high)
        .low(low)
        .close(bar.close)
        .volume(bar.volume as f64)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid bar at {}: {e:?}", bar.timestamp))
}

fn rsi_status(rsi: f64) -> &'static str {
    if rsi > RSI_OVERBOUGHT {
        "Overbought"
    } else if rsi < RSI_OVERSOLD {
        "Oversold"
    } else {
        "Neutral"
    }
}

fn atr_status(atr: f64) -> &'static str {
    if atr > ATR_HIGH_VOLATILITY {
        "High Volatility"
    } else {
        "Low Volatility"
    }
}

pub fn format_indicators(rows: &[IndicatorRow]) -> String {
    if rows.is_empty() {
        return "Not enough price history to compute technical indicators.".to_string();
    }

    rows.iter()
        .map(|r| {
            format!(
                "Date: {}\nClose Price: ${:.2}\nRSI: {:.1} ({})\nSMA (20): ${:.2}\nEMA (20): ${:.2}\nBollinger Bands (20, 2): ${:.2} / ${:.2} / ${:.2}\nVWAP: ${:.2}\nATR: {:.1} ({})",
                r.timestamp.format("%Y-%m-%d %H:%M"),
                r.close,
                r.rsi,
                rsi_status(r.rsi),
                r.sma_20,
                r.ema_20,
                r.bb_lower,
                r.bb_middle,
                r.bb_upper,
                r.vwap,
                r.atr,
                atr_status(r.atr),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
