// Rolling RSI engine.
//
// Holds the minimal sufficient statistic for the indicator: the last
// `window_length + 1` close prices plus the previously computed RSI scalar.
// Each update works over that fixed small window only, never over the full
// candle history, so cost per update stays constant under many tracked keys.

use std::collections::VecDeque;

use crate::error::ScanError;

/// RSI value plus its slope against the previous computation for the same key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReading {
    pub rsi: f64,
    pub slope: f64,
}

#[derive(Debug, Clone)]
pub struct RollingRsi {
    window_length: usize,
    closes: VecDeque<f64>,
    previous_rsi: Option<f64>,
}

impl RollingRsi {
    pub fn new(window_length: usize) -> Self {
        Self {
            window_length,
            closes: VecDeque::with_capacity(window_length + 1),
            previous_rsi: None,
        }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Slide one close price into the window, discarding the oldest value
    /// once more than `window_length + 1` are held.
    pub fn push(&mut self, close: f64) {
        self.closes.push_back(close);
        while self.closes.len() > self.window_length + 1 {
            self.closes.pop_front();
        }
    }

    /// Seed from an initial close batch; keeps only the trailing
    /// `window_length + 1` values.
    pub fn seed(&mut self, closes: impl IntoIterator<Item = f64>) {
        for close in closes {
            self.push(close);
        }
    }

    /// Compute RSI and slope over the current window.
    ///
    /// Requires `window_length + 1` closes; below that the indicator is
    /// undefined for this cycle and `InsufficientData` tells the caller to
    /// skip evaluation rather than emit a spurious value.
    ///
    /// `avg_gain` is the mean of positive per-step changes (zero substituted
    /// for the rest), `avg_loss` the mean magnitude of negative changes.
    /// A zero `avg_loss` is the defined saturation case: RSI pins to 100
    /// instead of propagating a division by zero.
    ///
    /// The slope is measured against the previous RSI for this key; on the
    /// first computation `previous_rsi` defaults to the current value, so the
    /// first slope is exactly zero.
    pub fn update(&mut self) -> Result<RsiReading, ScanError> {
        let need = self.window_length + 1;
        if self.closes.len() < need {
            return Err(ScanError::InsufficientData {
                have: self.closes.len(),
                need,
            });
        }

        let mut gain_sum = 0.0;
        let mut loss_sum = 0.0;
        for pair in self.closes.iter().zip(self.closes.iter().skip(1)) {
            let change = pair.1 - pair.0;
            if change > 0.0 {
                gain_sum += change;
            } else {
                loss_sum += -change;
            }
        }
        let avg_gain = gain_sum / self.window_length as f64;
        let avg_loss = loss_sum / self.window_length as f64;

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };

        let slope = rsi - self.previous_rsi.unwrap_or(rsi);
        self.previous_rsi = Some(rsi);

        Ok(RsiReading { rsi, slope })
    }
}
