//! Bot construction, long polling, and webhook registration.

use std::sync::Arc;

use relay_core::Relay;
use teloxide::dispatching::{ShutdownToken, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::error::{TelegramError, TelegramResult};
use crate::update::{inbound_callback, inbound_text};

/// Create a bot for `token`.
#[must_use]
pub fn build_bot(token: &str) -> Bot {
    Bot::new(token)
}

async fn on_message(msg: Message, relay: Arc<Relay>) -> anyhow::Result<()> {
    relay.handle_text(inbound_text(&msg)).await;
    Ok(())
}

async fn on_callback(query: CallbackQuery, relay: Arc<Relay>) -> anyhow::Result<()> {
    relay.handle_callback(inbound_callback(&query)).await;
    Ok(())
}

fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

/// A running long-polling dispatcher.
pub struct Poller {
    token: ShutdownToken,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller").finish_non_exhaustive()
    }
}

impl Poller {
    /// Start polling for updates and feeding them to `relay`.
    ///
    /// Polling removes any webhook registered for the bot.
    #[must_use]
    pub fn start(bot: Bot, relay: Arc<Relay>) -> Self {
        let mut dispatcher = Dispatcher::builder(bot, handler())
            .dependencies(dptree::deps![relay])
            .default_handler(|update| async move {
                tracing::debug!(update_id = ?update.id, "Unhandled update");
            })
            .build();
        let token = dispatcher.shutdown_token();

        info!("Starting Telegram long polling");
        let task = tokio::spawn(async move {
            Box::pin(dispatcher.dispatch()).await;
            info!("Telegram polling stopped");
        });

        Self { token, task }
    }

    /// Stop polling and wait for in-flight handlers.
    pub async fn stop(self) {
        match self.token.shutdown() {
            Ok(done) => done.await,
            Err(e) => warn!("Polling was not running: {e}"),
        }
        if let Err(e) = self.task.await {
            warn!("Polling task failed: {e}");
        }
    }
}

/// Register `endpoint` as the bot's webhook.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the Bot API call fails.
pub async fn set_webhook(bot: &Bot, endpoint: &str) -> TelegramResult<()> {
    let url = Url::parse(endpoint).map_err(|e| TelegramError::InvalidWebhookUrl {
        url: endpoint.to_string(),
        message: e.to_string(),
    })?;
    bot.set_webhook(url).await?;
    info!(endpoint, "Webhook set");
    Ok(())
}

/// Remove the bot's webhook.
///
/// # Errors
///
/// Returns an error if the Bot API call fails.
pub async fn delete_webhook(bot: &Bot) -> TelegramResult<()> {
    bot.delete_webhook().await?;
    info!("Webhook deleted");
    Ok(())
}
