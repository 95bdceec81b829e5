//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "etl_db";

/// Default database user.
pub const DEFAULT_DB_USER: &str = "etl_user";

/// Default database password for local development.
pub const DEFAULT_DB_PASS: &str = "etl_pass";

/// Default maximum database connections in the pool.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default directory polled for incoming CSV batches.
pub const DEFAULT_FEED_DIR: &str = "/data/feed";

/// Subdirectory of the feed directory that receives archived batches.
pub const PROCESSED_SUBDIR: &str = "processed";

/// Default polling interval in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub schedule: ScheduleConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Full connection URL; takes precedence over the individual parts
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Input feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub feed_dir: PathBuf,
}

/// Polling schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

impl DatabaseConfig {
    /// Connection URL built from `url` or the individual parts
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }

    /// Connection target with credentials removed, safe to log
    pub fn redacted_url(&self) -> String {
        match &self.url {
            Some(url) => match url.rsplit_once('@') {
                Some((_, target)) => format!("postgresql://***@{}", target),
                None => url.clone(),
            },
            None => format!(
                "postgresql://{}:***@{}:{}/{}",
                self.user, self.host, self.port, self.name
            ),
        }
    }
}

impl FeedConfig {
    pub fn new(feed_dir: impl Into<PathBuf>) -> Self {
        Self {
            feed_dir: feed_dir.into(),
        }
    }

    /// Directory that archived batches are moved into
    pub fn processed_dir(&self) -> PathBuf {
        self.feed_dir.join(PROCESSED_SUBDIR)
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            database: DatabaseConfig {
                host: env_or("DB_HOST", DEFAULT_DB_HOST),
                port: env_parse("DB_PORT", DEFAULT_DB_PORT)?,
                name: env_or("DB_NAME", DEFAULT_DB_NAME),
                user: env_or("DB_USER", DEFAULT_DB_USER),
                password: env_or("DB_PASS", DEFAULT_DB_PASS),
                url: std::env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
                max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
                connect_timeout_secs: env_parse(
                    "DB_CONNECT_TIMEOUT",
                    DEFAULT_DB_CONNECT_TIMEOUT_SECS,
                )?,
            },
            feed: FeedConfig::new(env_or("FEED_DIR", DEFAULT_FEED_DIR)),
            schedule: ScheduleConfig {
                interval_minutes: env_parse("INTERVAL_MINUTES", DEFAULT_INTERVAL_MINUTES)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.port == 0 {
            anyhow::bail!("DB_PORT must be greater than 0");
        }

        if self.database.url.is_none() && self.database.name.trim().is_empty() {
            anyhow::bail!("DB_NAME cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be greater than 0");
        }

        if self.feed.feed_dir.as_os_str().is_empty() {
            anyhow::bail!("FEED_DIR cannot be empty");
        }

        if self.schedule.interval_minutes == 0 {
            anyhow::bail!("INTERVAL_MINUTES must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                host: DEFAULT_DB_HOST.to_string(),
                port: DEFAULT_DB_PORT,
                name: DEFAULT_DB_NAME.to_string(),
                user: DEFAULT_DB_USER.to_string(),
                password: DEFAULT_DB_PASS.to_string(),
                url: None,
                max_connections: DEFAULT_DB_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            },
            feed: FeedConfig::new(DEFAULT_FEED_DIR),
            schedule: ScheduleConfig {
                interval_minutes: DEFAULT_INTERVAL_MINUTES,
            },
        }
    }
}
