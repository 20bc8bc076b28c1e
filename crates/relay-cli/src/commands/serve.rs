//! The `serve` command: run the relay until Ctrl-C or stdin closes.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use relay_config::{Overrides, Settings, TransportMode};
use relay_core::Relay;
use relay_gateway::GatewayState;
use relay_mcp::RelayMcpServer;
use relay_telegram::{Bot, Poller, TelegramTransport, build_bot, delete_webhook, set_webhook};
use tracing::{error, info, warn};

pub(crate) async fn run(config: Option<&Path>, overrides: Overrides) -> Result<()> {
    let settings =
        relay_config::load(config, &overrides).context("failed to load configuration")?;
    relay_telemetry::setup_logging(&settings.logging).context("failed to set up logging")?;

    info!(
        transport = %settings.transport,
        mode = settings.delivery_mode().as_str(),
        chat_id = %settings.chat,
        "Starting telegram-relay"
    );

    let bot = build_bot(&settings.bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let relay = Arc::new(Relay::new(transport, settings.relay_settings()));

    if let Err(e) = relay.announce_online().await {
        warn!("Failed to send startup message: {e}");
    }

    match settings.transport {
        TransportMode::Stdio => run_stdio(bot, relay).await,
        TransportMode::Http => run_http(&settings, bot, relay).await,
    }
}

async fn run_stdio(bot: Bot, relay: Arc<Relay>) -> Result<()> {
    let poller = Poller::start(bot, Arc::clone(&relay));
    let server = RelayMcpServer::new(relay);

    let result = tokio::select! {
        result = server.run_stdio() => result,
        () = shutdown_signal() => Ok(()),
    };

    poller.stop().await;
    result
}

async fn run_http(settings: &Settings, bot: Bot, relay: Arc<Relay>) -> Result<()> {
    let listener = relay_gateway::bind(settings.listen_addr).await?;

    let webhook = settings.webhook_endpoint();
    let poller = match &webhook {
        Some(endpoint) => {
            if let Err(e) = set_webhook(&bot, endpoint).await {
                error!("Failed to set webhook: {e}");
            }
            None
        },
        None => Some(Poller::start(bot.clone(), Arc::clone(&relay))),
    };

    relay_gateway::serve(listener, GatewayState::new(relay), shutdown_signal()).await?;

    if webhook.is_some()
        && let Err(e) = delete_webhook(&bot).await
    {
        warn!("Failed to delete webhook: {e}");
    }
    if let Some(poller) = poller {
        poller.stop().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, shutting down");
}
