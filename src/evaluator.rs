// Rule-based signal classification. Pure: identical inputs always yield the
// same kind, and producing a Signal is the caller's job.

use crate::types::SignalKind;

/// Inputs for one evaluation of one (instrument, timeframe) key.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    pub rsi: f64,
    pub rsi_slope: f64,
    /// Volume of the latest candle.
    pub latest_volume: f64,
    /// Mean volume over the trailing window, `None` while too few candles
    /// exist to form it. `None` blocks the volume-gated BUY rule.
    pub trailing_volume_average: Option<f64>,
    pub volume_multiplier: f64,
}

/// First match wins, evaluated in this order:
///
/// 1. BUY  iff rsi > 50, slope > 0 and latest volume exceeds
///    `volume_multiplier` times the trailing average.
/// 2. SELL iff rsi < 30 and slope < 0.
/// 3. otherwise NONE.
pub fn classify(eval: &Evaluation) -> SignalKind {
    let volume_confirmed = matches!(
        eval.trailing_volume_average,
        Some(avg) if eval.latest_volume > eval.volume_multiplier * avg
    );

    if eval.rsi > 50.0 && eval.rsi_slope > 0.0 && volume_confirmed {
        SignalKind::Buy
    } else if eval.rsi < 30.0 && eval.rsi_slope < 0.0 {
        SignalKind::Sell
    } else {
        SignalKind::None
    }
}
