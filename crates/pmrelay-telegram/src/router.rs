use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
    types::{CallbackQuery, Message},
    update_listeners::webhooks,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pmrelay_core::{
    config::{Config, Mode},
    messaging::types::InboundEvent,
    routing::Router,
};

use crate::normalize::{normalize_callback, normalize_message};

/// Create the bot and make sure the token is accepted.
pub async fn connect(token: &str) -> anyhow::Result<Bot> {
    let bot = Bot::new(token);
    let me = bot
        .get_me()
        .await
        .context("telegram rejected the bot token")?;
    info!("authorized as @{}", me.username());
    Ok(bot)
}

/// Running update loop.
pub struct Transport {
    shutdown: ShutdownToken,
    handle: JoinHandle<()>,
}

impl Transport {
    /// Stop accepting updates and wait for the in-flight one to finish.
    pub async fn shutdown(self) {
        match self.shutdown.shutdown() {
            Ok(stopped) => stopped.await,
            Err(_) => {
                debug!("dispatcher not running, aborting");
                self.handle.abort();
            }
        }
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                warn!("dispatcher task ended abnormally: {e}");
            }
        }
    }
}

/// Start receiving updates in the configured mode.
///
/// Every update goes through a single worker, so routing is strictly serial.
pub async fn start(bot: Bot, cfg: &Config, router: Arc<Router>) -> anyhow::Result<Transport> {
    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(Update::filter_message().endpoint(handle_message));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![router])
        .distribution_function(|_: &Update| Some(()))
        .default_handler(|upd| async move {
            debug!("unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build();
    let shutdown = dispatcher.shutdown_token();

    let handle = match cfg.account.mode {
        Mode::Polling => {
            info!("receiving updates by long polling");
            tokio::spawn(async move { dispatcher.dispatch().await })
        }
        Mode::Webhook => {
            let endpoint = cfg.account.endpoint.as_deref().unwrap_or_default();
            let url = reqwest::Url::parse(endpoint)
                .with_context(|| format!("invalid webhook endpoint {endpoint}"))?;
            let addr = SocketAddr::from(([0, 0, 0, 0], cfg.account.port.unwrap_or_default()));

            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url))
                .await
                .context("failed to register webhook")?;
            info!("receiving updates by webhook on {addr}");

            tokio::spawn(async move {
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("webhook listener"),
                    )
                    .await
            })
        }
    };

    Ok(Transport { shutdown, handle })
}

async fn handle_message(msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    router
        .dispatch(InboundEvent::Message(normalize_message(&msg)))
        .await;
    Ok(())
}

async fn handle_callback(q: CallbackQuery, router: Arc<Router>) -> ResponseResult<()> {
    router
        .dispatch(InboundEvent::Callback(normalize_callback(&q)))
        .await;
    Ok(())
}
