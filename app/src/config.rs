//! Process configuration read from `PB_*` environment variables

use slotwatch_networking::{http::DEFAULT_BASE_URL, DispatcherConfig};
use slotwatch_persistence::CacheConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const ENV_PREFIX: &str = "PB_";

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 120;
/// Sweeps closer together than this would hammer upstream
const MIN_UPDATE_INTERVAL_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_CACHE_CLEANUP_INTERVAL_SECS: u64 = 900;
const DEFAULT_MAX_PARALLELISM: usize = 4;
const DEFAULT_DATABASE_PATH: &str = "./data/main.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub update_interval: Duration,
    pub cache: CacheConfig,
    pub dispatcher: DispatcherConfig,
    pub database_path: PathBuf,
    pub api_base_url: String,
    /// Without a token notifications only go to the log
    pub telegram_bot_token: Option<String>,
    /// When set, only this chat may use the bot
    pub telegram_creator_id: Option<i64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Keys are given without the `PB_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |name: &str, default: u64| {
            var(name)
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default)
        };

        let mut update_secs = number("UPDATE_INTERVAL", DEFAULT_UPDATE_INTERVAL_SECS);
        if update_secs < MIN_UPDATE_INTERVAL_SECS {
            warn!(
                "Update interval of {}s is below the minimum, using {}s",
                update_secs, MIN_UPDATE_INTERVAL_SECS
            );
            update_secs = MIN_UPDATE_INTERVAL_SECS;
        }

        let max_parallelism = var("MAX_PARALLELISM")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_PARALLELISM)
            .max(1);

        Self {
            update_interval: Duration::from_secs(update_secs),
            cache: CacheConfig {
                ttl: Duration::from_secs(number("CACHE_TTL", DEFAULT_CACHE_TTL_SECS)),
                cleanup_interval: Duration::from_secs(number(
                    "CACHE_CLEANUP_INTERVAL",
                    DEFAULT_CACHE_CLEANUP_INTERVAL_SECS,
                )),
            },
            dispatcher: DispatcherConfig { max_parallelism },
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            api_base_url: var("API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN"),
            telegram_creator_id: var("TELEGRAM_CREATOR_ID")
                .and_then(|s| s.parse::<i64>().ok())
                .filter(|id| *id > 0),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
