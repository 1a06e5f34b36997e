// Error taxonomy for the per-key scan pipeline.
//
// A zero average loss during RSI computation is deliberately NOT an error:
// it is a defined saturation case (RSI pins to 100) handled inside the
// indicator engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Network/exchange-side failure retrieving candles or tickers.
    /// Recovered by skipping the key for the current pass; previous state
    /// stays valid and the key is retried on the next pass.
    #[error("market data fetch failed: {0}")]
    DataFetch(anyhow::Error),

    /// Fewer closes buffered than the indicator needs. Not a failure: the
    /// key skips signal evaluation for this cycle and keeps accumulating.
    #[error("insufficient data: have {have} closes, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// Read of an empty candle series. An ordering invariant violation that
    /// should not occur after a successful initial fetch; treated as fatal
    /// to the offending key.
    #[error("candle series is empty")]
    EmptySeries,
}

impl ScanError {
    pub fn fetch(err: impl Into<anyhow::Error>) -> Self {
        Self::DataFetch(err.into())
    }
}
