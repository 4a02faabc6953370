use std::{
    path::Path,
    sync::{Arc, RwLock},
};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    console::ConsoleEcho,
    domain::{ChatId, UserId},
    messaging::port::MessagingPort,
    store::RouteStore,
    Result,
};

/// Process-wide relay context shared by the router and the operator console.
///
/// Owns what used to be globals: the live config, the "last active chat"
/// scalar, and handles to the store, the messenger and the console.
pub struct RelaySession {
    cfg: RwLock<Arc<Config>>,
    last_active: Mutex<Option<ChatId>>,
    store: Arc<dyn RouteStore>,
    messenger: Arc<dyn MessagingPort>,
    echo: Arc<dyn ConsoleEcho>,
}

impl RelaySession {
    pub fn new(
        cfg: Config,
        store: Arc<dyn RouteStore>,
        messenger: Arc<dyn MessagingPort>,
        echo: Arc<dyn ConsoleEcho>,
    ) -> Self {
        Self {
            cfg: RwLock::new(Arc::new(cfg)),
            last_active: Mutex::new(None),
            store,
            messenger,
            echo,
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.cfg
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn owner(&self) -> UserId {
        self.config().owner()
    }

    pub fn store(&self) -> &dyn RouteStore {
        self.store.as_ref()
    }

    pub fn messenger(&self) -> &dyn MessagingPort {
        self.messenger.as_ref()
    }

    pub fn echo(&self) -> &dyn ConsoleEcho {
        self.echo.as_ref()
    }

    pub async fn set_last_active(&self, chat_id: ChatId) {
        *self.last_active.lock().await = Some(chat_id);
    }

    pub async fn last_active(&self) -> Option<ChatId> {
        *self.last_active.lock().await
    }

    /// Swap in a new config; returns the previous one.
    pub fn replace_config(&self, cfg: Config) -> Arc<Config> {
        let mut guard = self
            .cfg
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(cfg))
    }

    /// Re-read the config file. On failure the current config stays in place.
    ///
    /// Pruning afterwards is best effort; its failure does not undo the reload.
    pub fn reload(&self, path: &Path) -> Result<()> {
        let fresh = Config::load(path)?;
        let previous = self.replace_config(fresh);
        if previous.needs_restart(&self.config()) {
            warn!("transport or storage settings changed; they apply after a restart");
        }
        info!("configuration reloaded from {}", path.display());
        if let Err(e) = self.prune_expired() {
            error!("failed to prune route entries after reload: {e}");
        }
        Ok(())
    }

    /// Apply `storage.retention_days`, if configured.
    pub fn prune_expired(&self) -> Result<u64> {
        let Some(days) = self.config().storage.retention_days else {
            return Ok(0);
        };
        let cutoff = chrono::Utc::now().timestamp() - i64::from(days) * 24 * 60 * 60;
        let removed = self.store.prune_older_than(cutoff)?;
        if removed > 0 {
            info!(removed, retention_days = days, "pruned expired route entries");
        }
        Ok(removed)
    }
}
