use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{domain::UserId, errors::Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "bot.yaml";
pub const DEFAULT_DB_PATH: &str = "bot.db";

/// How the bot receives updates.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Polling,
    Webhook,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Polling => write!(f, "polling"),
            Mode::Webhook => write!(f, "webhook"),
        }
    }
}

/// Typed configuration, read from `bot.yaml` at startup and on reload.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub token: String,
    /// Telegram id of the administrator.
    pub owner: i64,
    /// Public URL Telegram posts updates to (webhook mode).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Local port the webhook listener binds (webhook mode).
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Route entries older than this are pruned at startup and reload.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            retention_days: None,
        }
    }
}

/// Optional overrides for the canned MarkdownV2 texts.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessagesConfig {
    pub welcome: Option<String>,
    pub token_tutorial: Option<String>,
    pub two_fa_tutorial: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut cfg = Self::parse(&content)?;

        if let Some(token) = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty) {
            cfg.account.token = token;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.token.trim().is_empty() {
            return Err(Error::Config(
                "account.token (or TELEGRAM_BOT_TOKEN) is required".to_string(),
            ));
        }
        if self.account.owner == 0 {
            return Err(Error::Config("account.owner is required".to_string()));
        }
        if self.account.mode == Mode::Webhook {
            if self.account.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                return Err(Error::Config(
                    "account.endpoint is required in webhook mode".to_string(),
                ));
            }
            if self.account.port.unwrap_or(0) == 0 {
                return Err(Error::Config(
                    "account.port is required in webhook mode".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn owner(&self) -> UserId {
        UserId(self.account.owner)
    }

    /// Settings that only take effect after a restart.
    pub fn needs_restart(&self, newer: &Config) -> bool {
        self.account.token != newer.account.token
            || self.account.mode != newer.account.mode
            || self.account.endpoint != newer.account.endpoint
            || self.account.port != newer.account.port
            || self.storage.path != newer.storage.path
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
