use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rsi_scanner::config;
use rsi_scanner::market::BinanceClient;
use rsi_scanner::notify::Telegram;
use rsi_scanner::scanner::Scanner;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = config::load_config()?;

    let market = BinanceClient::new(&cfg.market.rest_base)?;
    let symbols = if cfg.symbols.is_empty() {
        market
            .top_symbols_by_volume(&cfg.market.quote_asset, cfg.top_n)
            .await?
    } else {
        cfg.symbols.clone()
    };
    info!("Scanning {} symbols: {:?}", symbols.len(), symbols);

    let notifier = Telegram::new(cfg.telegram.bot_token.clone(), cfg.telegram.chat_ids.clone())?;

    let mut scanner = Scanner::new(cfg, symbols, market, notifier)?;
    scanner.run().await
}
