// Multi-timeframe scan loop.
//
// One pass walks every (symbol, timeframe) pair sequentially, so no per-key
// state is ever touched concurrently. Failures are caught at this boundary,
// logged with the offending key, and never spill into other keys or abort
// the loop.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{FixedOffset, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::aggregator::IncrementalAggregator;
use crate::config::{AppCfg, TimeframeCfg};
use crate::error::ScanError;
use crate::evaluator::{classify, Evaluation};
use crate::indicator::RollingRsi;
use crate::market::MarketData;
use crate::notify::Notifier;
use crate::series::CandleSeries;
use crate::types::{ScanKey, Signal, SignalKind, Timeframe};

/// All rolling state for one (symbol, timeframe) key. Owned exclusively by
/// the scanner; created lazily on the key's first pass.
struct KeyState {
    series: CandleSeries,
    aggregator: IncrementalAggregator,
    rsi: RollingRsi,
    seeded: bool,
}

impl KeyState {
    fn new(kline_limit: usize, timeframe: &Timeframe, params: &TimeframeCfg) -> Self {
        Self {
            series: CandleSeries::new(kline_limit),
            aggregator: IncrementalAggregator::new(timeframe.interval_secs()),
            rsi: RollingRsi::new(params.window_length),
            seeded: false,
        }
    }
}

pub struct Scanner<M, N> {
    market: M,
    notifier: N,
    cfg: AppCfg,
    symbols: Vec<String>,
    timeframes: Vec<(Timeframe, TimeframeCfg)>,
    states: HashMap<ScanKey, KeyState>,
}

impl<M: MarketData, N: Notifier> Scanner<M, N> {
    pub fn new(cfg: AppCfg, symbols: Vec<String>, market: M, notifier: N) -> anyhow::Result<Self> {
        let mut timeframes = Vec::with_capacity(cfg.timeframes.len());
        for (label, params) in &cfg.timeframes {
            timeframes.push((Timeframe::parse(label)?, params.clone()));
        }
        Ok(Self {
            market,
            notifier,
            cfg,
            symbols,
            timeframes,
            states: HashMap::new(),
        })
    }

    /// Drive passes forever on the configured cadence.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "SCANNER: Starting with {} symbols x {} timeframes, pass every {}s",
            self.symbols.len(),
            self.timeframes.len(),
            self.cfg.poll_interval_secs
        );

        let mut cadence = interval(Duration::from_secs(self.cfg.poll_interval_secs));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            cadence.tick().await;
            let started = Instant::now();
            let signals = self.pass().await;
            info!(
                "SCANNER: Pass complete in {:.1}s, {} signal(s) emitted",
                started.elapsed().as_secs_f64(),
                signals.len()
            );
        }
    }

    /// One sequential sweep over every tracked key. Returns the signals
    /// emitted this pass, in evaluation order (so same-key signals stay
    /// ordered across passes).
    pub async fn pass(&mut self) -> Vec<Signal> {
        let symbols = self.symbols.clone();
        let timeframes = self.timeframes.clone();
        let mut emitted = Vec::new();

        for symbol in &symbols {
            for (timeframe, params) in &timeframes {
                let key = ScanKey::new(symbol.clone(), timeframe.label());
                match self.process_key(&key, timeframe, params).await {
                    Ok(Some(signal)) => emitted.push(signal),
                    Ok(None) => {}
                    Err(ScanError::InsufficientData { have, need }) => {
                        debug!(
                            "SCANNER: {} has {}/{} closes, skipping evaluation this pass",
                            key, have, need
                        );
                    }
                    Err(ScanError::EmptySeries) => {
                        // Ordering invariant violated for this key: drop its
                        // state and rebuild from a fresh batch next pass.
                        error!("SCANNER: {} hit an empty series, resetting key state", key);
                        self.states.remove(&key);
                    }
                    Err(ScanError::DataFetch(err)) => {
                        warn!("SCANNER: Fetch failed for {}, retrying next pass: {err:#}", key);
                    }
                }
            }
        }

        emitted
    }

    /// Advance one key by one cycle: ingest the newest data, update the
    /// rolling indicator, classify, and dispatch any non-NONE signal.
    async fn process_key(
        &mut self,
        key: &ScanKey,
        timeframe: &Timeframe,
        params: &TimeframeCfg,
    ) -> Result<Option<Signal>, ScanError> {
        if !self.states.contains_key(key) {
            self.states.insert(
                key.clone(),
                KeyState::new(self.cfg.kline_limit, timeframe, params),
            );
        }

        let seeded = self.states[key].seeded;
        if !seeded {
            // First pass for this key: bulk-load a full batch and seed the
            // indicator window from its closes.
            let batch = self
                .market
                .fetch_klines(&key.symbol, timeframe.label(), self.cfg.kline_limit as u32)
                .await
                .map_err(ScanError::fetch)?;
            if batch.is_empty() {
                return Err(ScanError::fetch(anyhow!("empty kline batch for {key}")));
            }
            let state = self.states.get_mut(key).expect("state inserted above");
            state.rsi.seed(batch.iter().map(|c| c.close));
            state.series.load_batch(batch);
            state.seeded = true;
        } else if self.cfg.synthesize_candles {
            let ticker = self
                .market
                .fetch_ticker(&key.symbol)
                .await
                .map_err(ScanError::fetch)?;
            let state = self.states.get_mut(key).expect("state inserted above");
            state
                .aggregator
                .apply_tick(&mut state.series, &ticker, Instant::now(), Utc::now());
            let close = state.series.last()?.close;
            state.rsi.push(close);
        } else {
            let latest = self
                .market
                .fetch_klines(&key.symbol, timeframe.label(), 1)
                .await
                .map_err(ScanError::fetch)?;
            let candle = latest
                .into_iter()
                .next_back()
                .ok_or_else(|| ScanError::fetch(anyhow!("no latest kline for {key}")))?;
            let state = self.states.get_mut(key).expect("state inserted above");
            state.series.append_or_extend(candle);
            state.rsi.push(candle.close);
        }

        let state = self.states.get_mut(key).expect("state inserted above");
        let reading = state.rsi.update()?;
        let candle = *state.series.last()?;
        let trailing = state.series.trailing_volume_average(self.cfg.volume_window);

        let kind = classify(&Evaluation {
            rsi: reading.rsi,
            rsi_slope: reading.slope,
            latest_volume: candle.volume,
            trailing_volume_average: trailing,
            volume_multiplier: params.volume_multiplier,
        });
        if kind == SignalKind::None {
            return Ok(None);
        }

        let signal = Signal {
            kind,
            symbol: key.symbol.clone(),
            timeframe: timeframe.label().to_string(),
            candle,
            rsi: reading.rsi,
            rsi_slope: reading.slope,
            time: Utc::now(),
        };

        let message = format_alert(&signal, &params.style, self.cfg.utc_offset_hours);
        info!("SCANNER: {} -> {}", key, message);
        if let Err(err) = self.notifier.send(&message).await {
            // Delivery is fire-and-forget; the signal still counts as emitted.
            warn!("SCANNER: Notification dispatch failed for {}: {err:#}", key);
        }

        Ok(Some(signal))
    }
}

/// Render one alert line in the channel's established format:
/// `{style}{local time} | {TF} BUY SIGNAL for {symbol} | O: .., H: .., L: ..,
/// C: .., V: .., RSI: .., RSI Slope: ..{style}`
pub fn format_alert(signal: &Signal, style: &str, utc_offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    let local_time = signal.candle.open_time.with_timezone(&offset);
    format!(
        "{style}{local_time} | {tf} {kind} SIGNAL for {symbol} | \
         O: {open}, H: {high}, L: {low}, C: {close}, V: {volume}, \
         RSI: {rsi:.2}, RSI Slope: {slope:.2}{style}",
        tf = signal.timeframe.to_uppercase(),
        kind = signal.kind,
        symbol = signal.symbol,
        open = signal.candle.open,
        high = signal.candle.high,
        low = signal.candle.low,
        close = signal.candle.close,
        volume = signal.candle.volume,
        rsi = signal.rsi,
        slope = signal.rsi_slope,
    )
}
