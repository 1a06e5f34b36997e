// Incremental tick-to-candle aggregation.
//
// Decides whether a tick opens a new candle or folds into the forming one,
// based on elapsed time since the last synthesized open. Boundaries therefore
// drift from calendar-aligned candle boundaries over long runs; that is a
// known limitation of the elapsed-time rule, preserved deliberately.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::series::CandleSeries;
use crate::types::{Candle, Ticker};

#[derive(Debug)]
pub struct IncrementalAggregator {
    interval: Duration,
    last_open: Option<Instant>,
}

impl IncrementalAggregator {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            last_open: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Apply one ticker reading to the series.
    ///
    /// If `now - last_open >= interval` (or no candle has been opened yet),
    /// a new single-tick candle stamped `stamp` is opened and the clock
    /// resets. Otherwise the forming candle is widened in place: high/low
    /// expand, close tracks the tick price, and volume is overwritten with
    /// the latest reading (see `Candle::apply_tick`).
    ///
    /// Fetch failures never reach this method; the caller surfaces them
    /// without touching the series, so prior state stays valid for retry.
    pub fn apply_tick(
        &mut self,
        series: &mut CandleSeries,
        ticker: &Ticker,
        now: Instant,
        stamp: DateTime<Utc>,
    ) {
        let rollover = match self.last_open {
            Some(opened) => now.duration_since(opened) >= self.interval,
            None => true,
        };

        if rollover || series.is_empty() {
            series.push(Candle::from_tick(stamp, ticker.last_price, ticker.quote_volume));
            self.last_open = Some(now);
        } else if let Ok(last) = series.last_mut() {
            last.apply_tick(ticker.last_price, ticker.quote_volume);
        }
    }
}
