use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::TelegramConfig;

/// One event pushed by the Bot API.
/// https://core.telegram.org/bots/api#update
///
/// Only text messages are acted on, so every field below is optional and
/// unknown update kinds (stickers, channel posts, member changes, ...)
/// deserialize into an inactionable shell instead of failing.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: Option<Chat>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    description: Option<String>,
}

/// Thin client for the three Bot API methods this service uses. Stateless:
/// the webhook subscription lives on Telegram's side and is never mirrored
/// locally.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Register `url` as the webhook callback.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        self.call("setWebhook", json!({ "url": url })).await
    }

    /// Remove the current webhook registration and drop any updates Telegram
    /// still has queued for delivery.
    pub async fn delete_webhook(&self) -> Result<()> {
        self.call("deleteWebhook", json!({ "drop_pending_updates": true }))
            .await
    }

    /// Send `text` to `chat_id`.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<()> {
        let url = format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token,
            method
        );

        // The URL embeds the bot token, so log the method name only.
        debug!("Calling Telegram API method {}", method);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach the Telegram API ({})", method))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error ({} {}): {}", method, status, error_body);
        }

        let reply: ApiReply = response
            .json()
            .await
            .with_context(|| format!("Failed to parse the Telegram API response ({})", method))?;

        if !reply.ok {
            anyhow::bail!(
                "Telegram API rejected {}: {}",
                method,
                reply.description.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(())
    }
}
