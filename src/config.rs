// Configuration structures and loading logic

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::types::Timeframe;

// ============================================================================
// Configuration Structures
// ============================================================================

/// Per-timeframe scan parameters. Each timeframe carries its own rolling
/// state, so these values are independent per entry.
#[derive(Debug, Deserialize, Clone)]
pub struct TimeframeCfg {
    /// RSI window length (number of price changes averaged).
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Latest volume must exceed this multiple of the trailing average
    /// for a BUY signal.
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
    /// Decoration wrapped around alert messages for this timeframe
    /// (e.g. "*", "**", "***" by prominence).
    #[serde(default)]
    pub style: String,
}

impl Default for TimeframeCfg {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            volume_multiplier: default_volume_multiplier(),
            style: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketCfg {
    #[serde(default = "default_rest_base")]
    pub rest_base: String,
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
}

impl Default for MarketCfg {
    fn default() -> Self {
        Self {
            rest_base: default_rest_base(),
            quote_asset: default_quote_asset(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramCfg {
    /// Bot token; the TELEGRAM_BOT_TOKEN environment variable overrides
    /// whatever the file holds, so the token can stay out of the file.
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppCfg {
    /// Explicit instrument list. Leave empty and set `top_n` to discover
    /// the most traded symbols instead.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// When `symbols` is empty, scan the top N symbols by 24h quote volume.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Timeframe label -> parameters. BTreeMap keeps pass order
    /// deterministic across runs.
    #[serde(default = "default_timeframes")]
    pub timeframes: BTreeMap<String, TimeframeCfg>,
    /// Maximum candles retained per (symbol, timeframe) series.
    #[serde(default = "default_kline_limit")]
    pub kline_limit: usize,
    /// Seconds between scan passes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Trailing window for the volume average used by the BUY rule.
    #[serde(default = "default_volume_window")]
    pub volume_window: usize,
    /// Fixed UTC offset (hours) used when rendering candle timestamps in
    /// alert messages.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// When true, candles are synthesized from ticker reads by the
    /// incremental aggregator instead of fetched pre-aggregated.
    #[serde(default)]
    pub synthesize_candles: bool,
    #[serde(default)]
    pub market: MarketCfg,
    #[serde(default)]
    pub telegram: TelegramCfg,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            top_n: default_top_n(),
            timeframes: default_timeframes(),
            kline_limit: default_kline_limit(),
            poll_interval_secs: default_poll_interval_secs(),
            volume_window: default_volume_window(),
            utc_offset_hours: default_utc_offset_hours(),
            synthesize_candles: false,
            market: MarketCfg::default(),
            telegram: TelegramCfg::default(),
        }
    }
}

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_window_length() -> usize {
    14
}

fn default_volume_multiplier() -> f64 {
    5.0
}

fn default_rest_base() -> String {
    "https://api.binance.com".to_string()
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_top_n() -> usize {
    10
}

fn default_timeframes() -> BTreeMap<String, TimeframeCfg> {
    let mut map = BTreeMap::new();
    for (label, style) in [("1m", "*"), ("5m", "**"), ("15m", "***")] {
        map.insert(
            label.to_string(),
            TimeframeCfg {
                window_length: default_window_length(),
                volume_multiplier: default_volume_multiplier(),
                style: style.to_string(),
            },
        );
    }
    map
}

fn default_kline_limit() -> usize {
    100
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_volume_window() -> usize {
    20
}

fn default_utc_offset_hours() -> i32 {
    -5 // Canada/Eastern, matching the alert timestamps the channel expects
}

// ============================================================================
// Configuration Loading
// ============================================================================

/// Load configuration from `--config <path>` or `./config.yaml`, apply
/// environment overrides, and validate.
pub fn load_config() -> Result<AppCfg> {
    let args: Vec<String> = std::env::args().collect();
    let path = args
        .windows(2)
        .find_map(|w| {
            if w[0] == "--config" {
                Some(w[1].clone())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "./config.yaml".to_string());

    let content = std::fs::read_to_string(&path)?;
    let mut cfg: AppCfg = serde_yaml::from_str(&content)?;

    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
        if !token.is_empty() {
            cfg.telegram.bot_token = token;
        }
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

/// Validate configuration values
pub fn validate_config(cfg: &AppCfg) -> Result<()> {
    if cfg.kline_limit == 0 {
        return Err(anyhow!("kline_limit must be positive"));
    }
    if cfg.poll_interval_secs == 0 {
        return Err(anyhow!("poll_interval_secs must be positive"));
    }
    if cfg.volume_window == 0 {
        return Err(anyhow!("volume_window must be positive"));
    }
    if cfg.timeframes.is_empty() {
        return Err(anyhow!("at least one timeframe must be configured"));
    }
    if cfg.symbols.is_empty() && cfg.top_n == 0 {
        return Err(anyhow!(
            "either symbols or top_n must be set; nothing to scan otherwise"
        ));
    }
    if cfg.utc_offset_hours.abs() > 14 {
        return Err(anyhow!(
            "utc_offset_hours ({}) is outside the valid offset range",
            cfg.utc_offset_hours
        ));
    }

    for (label, tf) in &cfg.timeframes {
        Timeframe::parse(label)
            .map_err(|err| anyhow!("timeframe '{label}' is invalid: {err}"))?;
        if tf.window_length == 0 {
            return Err(anyhow!("timeframes.{label}.window_length must be positive"));
        }
        if tf.volume_multiplier <= 0.0 {
            return Err(anyhow!(
                "timeframes.{label}.volume_multiplier must be positive"
            ));
        }
        // The indicator needs window_length + 1 closes before it produces a
        // value; a smaller series cap would starve it forever.
        if cfg.kline_limit < tf.window_length + 1 {
            return Err(anyhow!(
                "kline_limit ({}) must be at least timeframes.{label}.window_length + 1 ({})",
                cfg.kline_limit,
                tf.window_length + 1
            ));
        }
    }

    if cfg.telegram.bot_token.is_empty() {
        return Err(anyhow!(
            "telegram.bot_token is required (set it in the config file or via TELEGRAM_BOT_TOKEN)"
        ));
    }
    if cfg.telegram.chat_ids.is_empty() {
        return Err(anyhow!("telegram.chat_ids must list at least one chat"));
    }

    Ok(())
}
