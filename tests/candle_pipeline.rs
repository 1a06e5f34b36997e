// Candle series bounding and incremental tick aggregation

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use rsi_scanner::aggregator::IncrementalAggregator;
use rsi_scanner::error::ScanError;
use rsi_scanner::series::CandleSeries;
use rsi_scanner::types::{Candle, Ticker};

fn candle(ts_secs: i64, close: f64, volume: f64) -> Candle {
    Candle {
        open_time: Utc.timestamp_opt(ts_secs, 0).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume,
    }
}

#[test]
fn eviction_keeps_only_the_most_recent_candles() {
    let mut series = CandleSeries::new(5);
    for i in 0..12 {
        series.append_or_extend(candle(i * 60, 100.0 + i as f64, 1.0));
    }

    assert_eq!(series.len(), 5);
    let closes: Vec<f64> = series.closes().collect();
    assert_eq!(closes, vec![107.0, 108.0, 109.0, 110.0, 111.0]);
}

#[test]
fn batch_load_applies_the_cap_once() {
    let mut series = CandleSeries::new(3);
    let batch: Vec<Candle> = (0..10).map(|i| candle(i * 60, i as f64, 1.0)).collect();
    series.load_batch(batch);

    assert_eq!(series.len(), 3);
    assert_eq!(series.closes().collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
}

#[test]
fn refetched_forming_candle_replaces_the_last_entry() {
    let mut series = CandleSeries::new(10);
    series.append_or_extend(candle(0, 10.0, 5.0));
    series.append_or_extend(candle(60, 11.0, 6.0));

    // Same open_time: the exchange re-reported the forming candle.
    let mut refreshed = candle(60, 11.5, 9.0);
    refreshed.high = 12.0;
    series.append_or_extend(refreshed);

    assert_eq!(series.len(), 2);
    let last = series.last().unwrap();
    assert_eq!(last.close, 11.5);
    assert_eq!(last.high, 12.0);
    assert_eq!(last.volume, 9.0);

    // Stale candles are discarded: open_time stays strictly increasing.
    series.append_or_extend(candle(0, 1.0, 1.0));
    assert_eq!(series.len(), 2);
    assert_eq!(series.last().unwrap().close, 11.5);
}

#[test]
fn last_on_empty_series_is_an_error() {
    let series = CandleSeries::new(5);
    assert!(matches!(series.last(), Err(ScanError::EmptySeries)));
}

#[test]
fn trailing_volume_average_needs_a_full_window() {
    let mut series = CandleSeries::new(50);
    for i in 0..19 {
        series.append_or_extend(candle(i * 60, 1.0, 10.0));
    }
    assert_eq!(series.trailing_volume_average(20), None);

    series.append_or_extend(candle(19 * 60, 1.0, 30.0));
    let avg = series.trailing_volume_average(20).unwrap();
    assert!((avg - (19.0 * 10.0 + 30.0) / 20.0).abs() < 1e-12);
}

#[test]
fn intra_interval_ticks_widen_the_forming_candle() {
    let mut series = CandleSeries::new(10);
    let mut agg = IncrementalAggregator::new(60);
    let t0 = Instant::now();
    let stamp = Utc.timestamp_opt(1_000, 0).unwrap();

    agg.apply_tick(
        &mut series,
        &Ticker { last_price: 100.0, quote_volume: 50.0 },
        t0,
        stamp,
    );
    assert_eq!(series.len(), 1);
    {
        let first = series.last().unwrap();
        assert_eq!((first.open, first.high, first.low, first.close), (100.0, 100.0, 100.0, 100.0));
        assert_eq!(first.volume, 50.0);
    }

    // 30s later: same candle, high widens, close tracks, volume is replaced.
    agg.apply_tick(
        &mut series,
        &Ticker { last_price: 105.0, quote_volume: 80.0 },
        t0 + Duration::from_secs(30),
        stamp,
    );
    // 45s: low widens.
    agg.apply_tick(
        &mut series,
        &Ticker { last_price: 97.0, quote_volume: 60.0 },
        t0 + Duration::from_secs(45),
        stamp,
    );

    assert_eq!(series.len(), 1);
    let formed = series.last().unwrap();
    assert_eq!(formed.open, 100.0);
    assert_eq!(formed.high, 105.0);
    assert_eq!(formed.low, 97.0);
    assert_eq!(formed.close, 97.0);
    // Replaced with the latest reading, not 50 + 80 + 60.
    assert_eq!(formed.volume, 60.0);
}

#[test]
fn elapsed_interval_opens_a_new_candle() {
    let mut series = CandleSeries::new(10);
    let mut agg = IncrementalAggregator::new(60);
    let t0 = Instant::now();
    let stamp0 = Utc.timestamp_opt(1_000, 0).unwrap();
    let stamp1 = Utc.timestamp_opt(1_061, 0).unwrap();

    agg.apply_tick(
        &mut series,
        &Ticker { last_price: 100.0, quote_volume: 10.0 },
        t0,
        stamp0,
    );
    agg.apply_tick(
        &mut series,
        &Ticker { last_price: 102.0, quote_volume: 25.0 },
        t0 + Duration::from_secs(61),
        stamp1,
    );

    assert_eq!(series.len(), 2);
    let opened = series.last().unwrap();
    assert_eq!(opened.open_time, stamp1);
    assert_eq!((opened.open, opened.high, opened.low, opened.close), (102.0, 102.0, 102.0, 102.0));
    assert_eq!(opened.volume, 25.0);
}
