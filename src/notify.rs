// Notification collaborator. Delivery is fire-and-forget from the scan
// loop's perspective: per-chat failures are logged, never retried here.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram bot channel: one `sendMessage` POST per configured chat id.
pub struct Telegram {
    http: Client,
    bot_token: String,
    chat_ids: Vec<String>,
}

impl Telegram {
    pub fn new(bot_token: String, chat_ids: Vec<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            bot_token,
            chat_ids,
        })
    }
}

impl Notifier for Telegram {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        for chat_id in &self.chat_ids {
            let payload = json!({
                "chat_id": chat_id,
                "text": text,
            });
            match self.http.post(&url).json(&payload).send().await {
                Ok(res) if res.status().is_success() => {
                    debug!("NOTIFY: Delivered alert to chat {}", chat_id);
                }
                Ok(res) => {
                    warn!(
                        "NOTIFY: Telegram rejected alert for chat {}: {}",
                        chat_id,
                        res.status()
                    );
                }
                Err(err) => {
                    warn!("NOTIFY: Failed to reach Telegram for chat {}: {}", chat_id, err);
                }
            }
        }
        Ok(())
    }
}
