// Market data collaborator: Binance spot REST client plus the trait the
// scan loop consumes, so tests can substitute an in-memory source.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::info;

use crate::types::{Candle, Ticker};

/// Fallible, per-call market data access. Both calls are treated as
/// independent and retryable; the scan loop isolates failures per key.
#[allow(async_fn_in_trait)]
pub trait MarketData {
    /// Most recent `limit` candles for (symbol, interval), oldest first.
    async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>>;

    /// Latest ticker reading for the symbol.
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker>;
}

pub struct BinanceClient {
    http: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct Ticker24h {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "quoteVolume")]
    quote_volume: String,
}

impl BinanceClient {
    pub fn new(rest_base: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let base_url = Url::parse(rest_base)?;
        Ok(Self { http, base_url })
    }

    /// Instruments quoted in `quote`, ranked by 24h quote volume, top `n`.
    /// Used when the config asks for universe discovery instead of an
    /// explicit symbol list.
    pub async fn top_symbols_by_volume(&self, quote: &str, n: usize) -> Result<Vec<String>> {
        let url = self.base_url.join("/api/v3/ticker/24hr")?;
        let res = self.http.get(url).send().await?;
        if !res.status().is_success() {
            anyhow::bail!("Ticker24hr error: {}", res.text().await?);
        }

        let tickers: Vec<Ticker24h> = res.json().await?;
        let mut ranked: Vec<(String, f64)> = tickers
            .into_iter()
            .filter(|t| t.symbol.ends_with(quote))
            .filter_map(|t| {
                let volume: f64 = t.quote_volume.parse().ok()?;
                Some((t.symbol, volume))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let symbols: Vec<String> = ranked.into_iter().take(n).map(|(s, _)| s).collect();
        info!(
            "MARKET: Selected top {} {}-quoted symbols by volume",
            symbols.len(),
            quote
        );
        Ok(symbols)
    }
}

impl MarketData for BinanceClient {
    async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let mut url = self.base_url.join("/api/v3/klines")?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("interval", interval)
            .append_pair("limit", &limit.to_string());

        let res = self.http.get(url).send().await?;
        if !res.status().is_success() {
            anyhow::bail!("Klines error: {}", res.text().await?);
        }

        // Kline rows come back as positional JSON arrays:
        // [open_time, open, high, low, close, volume, close_time, ...]
        let raw: Vec<serde_json::Value> = res.json().await?;
        let candles = raw
            .into_iter()
            .filter_map(|row| {
                let row = row.as_array()?;
                if row.len() < 6 {
                    return None;
                }
                Some(Candle {
                    open_time: ts_ms_to_utc(row[0].as_i64()?)?,
                    open: row[1].as_str()?.parse().ok()?,
                    high: row[2].as_str()?.parse().ok()?,
                    low: row[3].as_str()?.parse().ok()?,
                    close: row[4].as_str()?.parse().ok()?,
                    volume: row[5].as_str()?.parse().ok()?,
                })
            })
            .collect();

        Ok(candles)
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        let mut url = self.base_url.join("/api/v3/ticker/24hr")?;
        url.query_pairs_mut().append_pair("symbol", symbol);

        let res = self.http.get(url).send().await?;
        if !res.status().is_success() {
            anyhow::bail!("Ticker error: {}", res.text().await?);
        }

        let ticker: Ticker24h = res.json().await?;
        Ok(Ticker {
            last_price: ticker.last_price.parse()?,
            quote_volume: ticker.quote_volume.parse()?,
        })
    }
}

fn ts_ms_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}
