use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use tracing::{error, info, warn};

use pmrelay_core::{
    config::{Config, DEFAULT_CONFIG_PATH},
    console::{self, Console, StdoutEcho},
    logging::{self, LogHandle, LOG_FILE},
    routing::Router,
    session::RelaySession,
    store::{RedbRouteStore, RouteStore},
};
use pmrelay_telegram::{router as telegram, TelegramMessenger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log = logging::init("pmrelay", Path::new(LOG_FILE))?;
    logging::install_panic_hook();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let result = run(&config_path, &log).await;
    if let Err(e) = &result {
        error!("fatal: {e:#}");
    }

    match log.prune_backups() {
        Ok(0) => {}
        Ok(n) => info!("removed {n} expired log backups"),
        Err(e) => warn!("failed to prune log backups: {e}"),
    }
    info!("stopped");
    result
}

async fn run(config_path: &Path, log: &LogHandle) -> anyhow::Result<()> {
    info!("loading configuration from {}", config_path.display());
    let cfg = Config::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(mode = %cfg.account.mode, owner = cfg.account.owner, "configuration loaded");

    let store = Arc::new(
        RedbRouteStore::open(&cfg.storage.path)
            .with_context(|| format!("failed to open {}", cfg.storage.path.display()))?,
    );
    match store.len() {
        Ok(entries) => info!(entries, "route store opened"),
        Err(e) => warn!("failed to count route entries: {e}"),
    }

    let bot = telegram::connect(&cfg.account.token).await?;
    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));

    let session = Arc::new(RelaySession::new(
        cfg,
        store,
        messenger,
        Arc::new(StdoutEcho),
    ));
    if let Err(e) = session.prune_expired() {
        error!("failed to prune route entries: {e}");
    }

    let router = Arc::new(Router::new(session.clone()));
    let transport = telegram::start(bot, &session.config(), router).await?;

    let lines = console::spawn_stdin_reader().context("failed to start console")?;
    let console_task = tokio::spawn(Console::new(session.clone()).run(lines));

    info!("relay is running");
    wait_for_shutdown(&session, config_path, log).await?;

    info!("shutting down");
    transport.shutdown().await;
    console_task.abort();
    let _ = console_task.await;
    drop(session);
    info!("route store closed");
    Ok(())
}

/// Serve reload signals until asked to stop.
#[cfg(unix)]
async fn wait_for_shutdown(
    session: &RelaySession,
    config_path: &Path,
    log: &LogHandle,
) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                info!("received SIGHUP, reloading configuration and log file");
                if let Err(e) = session.reload(config_path) {
                    error!("failed to reload configuration: {e}");
                }
                if let Err(e) = log.reopen() {
                    error!("failed to reopen log file: {e}");
                }
            }
            _ = terminate.recv() => {
                info!("received SIGTERM");
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT");
                return Ok(());
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(
    _session: &RelaySession,
    _config_path: &Path,
    _log: &LogHandle,
) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("received Ctrl-C");
    Ok(())
}
