use anyhow::Result;
use tracing::{error, info, warn};

use crate::llm::LlmClient;
use crate::store::LogStore;
use crate::telegram::{TelegramClient, Update};

pub const STATUS_RUNNING: &str = "The telegram bot is running.";
pub const STATUS_START_FAILED: &str = "Failed to start the telegram bot.";
pub const STATUS_STOPPED: &str = "The telegram bot has stopped.";
pub const STATUS_STOP_FAILED: &str = "Failed to stop the telegram bot.";

/// What `handle_update` did with one delivery. The HTTP layer acknowledges
/// the platform with `200 "ok"` no matter which variant comes back, since
/// Telegram never consumes an error body and only retries on non-2xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The update carried no text message; nothing to do.
    Ignored,
    /// A reply was generated and handed back to the sender's chat.
    Answered,
    /// Generation or delivery failed; already logged.
    Failed,
}

/// Owns the webhook subscription lifecycle and inbound update routing.
///
/// Holds no subscription state of its own: every enable/disable issues fresh
/// commands against the Bot API and trusts the remote response, so an update
/// arriving while a disable is in flight races harmlessly.
pub struct WebhookController {
    telegram: TelegramClient,
    llm: LlmClient,
    store: LogStore,
    model: String,
    callback_url: String,
}

impl WebhookController {
    pub fn new(
        telegram: TelegramClient,
        llm: LlmClient,
        store: LogStore,
        model: String,
        callback_url: String,
    ) -> Self {
        Self {
            telegram,
            llm,
            store,
            model,
            callback_url,
        }
    }

    /// Point Telegram at the callback URL. The registration is always
    /// preceded by a deregistration that drops queued updates, so a
    /// reconfigured bot never replays stale traffic; the deregistration's
    /// outcome does not gate the registration.
    pub async fn enable(&self) -> &'static str {
        if let Err(e) = self.telegram.delete_webhook().await {
            warn!("deleteWebhook before registration failed: {:#}", e);
        }

        match self.telegram.set_webhook(&self.callback_url).await {
            Ok(()) => {
                info!("Webhook registered: {}", self.callback_url);
                STATUS_RUNNING
            }
            Err(e) => {
                error!("Failed to register webhook: {:#}", e);
                STATUS_START_FAILED
            }
        }
    }

    /// Deregister the webhook and drop anything Telegram still has queued.
    pub async fn disable(&self) -> &'static str {
        match self.telegram.delete_webhook().await {
            Ok(()) => {
                info!("Webhook deregistered");
                STATUS_STOPPED
            }
            Err(e) => {
                error!("Failed to deregister webhook: {:#}", e);
                STATUS_STOP_FAILED
            }
        }
    }

    /// Route one delivered update: record it, generate a reply, send it back
    /// to the originating chat. Updates without a text message are dropped
    /// silently, since Telegram pushes plenty of kinds this bot does not speak.
    pub async fn handle_update(&self, update: Update) -> Disposition {
        let Some(message) = update.message else {
            return Disposition::Ignored;
        };
        let (Some(chat), Some(text)) = (message.chat, message.text) else {
            return Disposition::Ignored;
        };
        let chat_id = chat.id;

        info!("Webhook update from chat {}: {}", chat_id, text);

        if let Err(e) = self.store.append(&chat_id.to_string(), &text).await {
            error!("Failed to record webhook message: {:#}", e);
        }

        match self.reply(chat_id, &text).await {
            Ok(()) => Disposition::Answered,
            Err(e) => {
                error!("Failed to answer chat {}: {:#}", chat_id, e);
                Disposition::Failed
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        let generated = self.llm.complete(&self.model, text).await?;
        self.telegram.send_message(chat_id, &generated).await
    }
}
