// Bounded, append-only candle storage for one (instrument, timeframe) key.

use std::collections::VecDeque;

use crate::error::ScanError;
use crate::types::Candle;

/// Ordered sequence of candles, FIFO-bounded to `kline_limit`.
///
/// Created on the first fetch for a key, mutated by the aggregator or by
/// appended source candles, never shrinks below one entry once populated.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: VecDeque<Candle>,
    kline_limit: usize,
}

impl CandleSeries {
    pub fn new(kline_limit: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(kline_limit.min(1024)),
            kline_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn kline_limit(&self) -> usize {
        self.kline_limit
    }

    /// Seed the series from an initial batch fetch. Only the batch-size cap
    /// applies here: if the source handed back more than `kline_limit`
    /// candles, the oldest extras are dropped once, not per item.
    pub fn load_batch(&mut self, batch: Vec<Candle>) {
        self.candles.clear();
        let skip = batch.len().saturating_sub(self.kline_limit);
        self.candles.extend(batch.into_iter().skip(skip));
    }

    /// Append a completed candle fetched from the source, or refresh the
    /// current one.
    ///
    /// Exchanges re-report the still-forming candle under the same open time
    /// on consecutive fetches, so an incoming candle with `open_time` equal
    /// to the stored last replaces it in place. Strictly newer candles are
    /// appended; stale (older) candles are discarded. This keeps `open_time`
    /// strictly increasing across the series.
    pub fn append_or_extend(&mut self, candle: Candle) {
        match self.candles.back_mut() {
            Some(last) if candle.open_time == last.open_time => {
                *last = candle;
            }
            Some(last) if candle.open_time < last.open_time => {}
            _ => {
                self.candles.push_back(candle);
                self.evict_excess();
            }
        }
    }

    /// Push a freshly opened candle without boundary checks. Used by the
    /// aggregator, which owns the open-vs-mutate decision.
    pub fn push(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        self.evict_excess();
    }

    /// Restore `len <= kline_limit` by dropping the oldest candles.
    pub fn evict_excess(&mut self) {
        while self.candles.len() > self.kline_limit {
            self.candles.pop_front();
        }
    }

    pub fn last(&self) -> Result<&Candle, ScanError> {
        self.candles.back().ok_or(ScanError::EmptySeries)
    }

    pub fn last_mut(&mut self) -> Result<&mut Candle, ScanError> {
        self.candles.back_mut().ok_or(ScanError::EmptySeries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.candles.iter().map(|c| c.close)
    }

    /// Mean volume over the trailing `window` candles, or `None` when fewer
    /// than `window` candles exist yet. Callers treat `None` as "volume
    /// confirmation unavailable", which blocks volume-gated signals.
    pub fn trailing_volume_average(&self, window: usize) -> Option<f64> {
        if window == 0 || self.candles.len() < window {
            return None;
        }
        let sum: f64 = self
            .candles
            .iter()
            .rev()
            .take(window)
            .map(|c| c.volume)
            .sum();
        Some(sum / window as f64)
    }
}
