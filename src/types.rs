// Core data types shared across the scanner modules

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

/// One OHLCV candle.
///
/// Invariants maintained by the series/aggregator:
/// - `high >= max(open, close, low)`
/// - `low <= min(open, close, high)`
/// - `volume >= 0`
/// - `open_time` strictly increasing across a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Open a fresh single-tick candle: all four prices collapse to the tick price.
    pub fn from_tick(open_time: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            open_time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    /// Fold a tick into a forming candle.
    ///
    /// `high`/`low` only widen, `close` tracks the tick price exactly.
    /// Volume is REPLACED with the latest reported quote volume, not summed:
    /// the ticker reports a cumulative reading, so overwriting is the preserved
    /// source semantics even though it can undercount intra-candle turnover.
    pub fn apply_tick(&mut self, price: f64, volume: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume = volume;
    }
}

/// Latest ticker reading for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ticker {
    pub last_price: f64,
    pub quote_volume: f64,
}

/// A candle interval, parsed from labels like `"30s"`, `"1m"`, `"15m"`, `"4h"`, `"1d"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timeframe {
    label: String,
    interval_secs: u64,
}

impl Timeframe {
    pub fn parse(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.len() < 2 || !label.is_ascii() {
            return Err(anyhow!("invalid timeframe label '{label}'"));
        }
        let (digits, unit) = label.split_at(label.len() - 1);
        let count: u64 = digits
            .parse()
            .map_err(|_| anyhow!("invalid timeframe label '{label}'"))?;
        if count == 0 {
            return Err(anyhow!("timeframe '{label}' must be non-zero"));
        }
        let unit_secs = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            _ => return Err(anyhow!("unknown timeframe unit in '{label}'")),
        };
        Ok(Self {
            label: label.to_string(),
            interval_secs: count * unit_secs,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

/// Identifies one independently tracked rolling state: (instrument, timeframe).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanKey {
    pub symbol: String,
    pub timeframe: String,
}

impl ScanKey {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }
}

impl std::fmt::Display for ScanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol, self.timeframe)
    }
}

/// Signal classification produced by the evaluator. `None` means no emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
    None,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Buy => f.write_str("BUY"),
            SignalKind::Sell => f.write_str("SELL"),
            SignalKind::None => f.write_str("NONE"),
        }
    }
}

/// Immutable evaluation result carrying the triggering metrics.
/// Produced once per evaluation, handed to the notification collaborator,
/// never persisted.
#[derive(Debug, Clone)]
pub struct Signal {
    pub kind: SignalKind,
    pub symbol: String,
    pub timeframe: String,
    pub candle: Candle,
    pub rsi: f64,
    pub rsi_slope: f64,
    pub time: DateTime<Utc>,
}
