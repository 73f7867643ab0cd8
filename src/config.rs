//! Relay configuration
//!
//! Defaults are overridden by `RELAY_*` environment variables (a `.env` file
//! is honored by the binary), which are in turn overridden by command-line
//! flags.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Announcement shown until an admin sets one
pub const DEFAULT_ANNOUNCEMENT: &str = "🔥 긴급 공지: 지진 발생 시 안전지대로 이동하세요";

/// Longest accepted rate-limit window
pub const MAX_RATE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted flush interval
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Configuration for the message store and its durable log
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Directory holding the durable log
    pub data_dir: PathBuf,
    /// File name of the durable log inside `data_dir`
    pub log_file: String,
    /// Buffer capacity (MAX_RECENT)
    pub max_recent: usize,
    /// Maximum text length in characters (MAX_TEXT)
    pub max_text_chars: usize,
    /// Minimum time between two accepted writes from one client; zero disables
    pub rate_window: Duration,
    /// Period between durable log flushes
    pub flush_interval: Duration,
    /// Pending batch size that wakes the flusher early
    pub max_batch_size: usize,
    /// Page size used when a read does not ask for one
    pub default_page_size: usize,
    /// Shared secret for the admin routes; admin is disabled when unset
    pub admin_secret: Option<String>,
    /// Initial announcement text
    pub announcement: String,
    /// Derive the client key from `X-Forwarded-For` (behind a reverse proxy)
    pub trust_forwarded_for: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            data_dir: PathBuf::from("data"),
            log_file: "messages.jsonl".to_string(),
            max_recent: 200,
            max_text_chars: 500,
            rate_window: Duration::from_secs(30),
            flush_interval: Duration::from_millis(500),
            max_batch_size: 256,
            default_page_size: 20,
            admin_secret: None,
            announcement: DEFAULT_ANNOUNCEMENT.to_string(),
            trust_forwarded_for: false,
        }
    }
}

impl RelayConfig {
    /// Create config with custom data directory
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load defaults overridden by `RELAY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = env_parse::<SocketAddr>("RELAY_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Ok(dir) = env::var("RELAY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(file) = env::var("RELAY_LOG_FILE") {
            config.log_file = file;
        }
        if let Some(n) = env_parse::<usize>("RELAY_MAX_RECENT")? {
            config.max_recent = n;
        }
        if let Some(n) = env_parse::<usize>("RELAY_MAX_TEXT")? {
            config.max_text_chars = n;
        }
        if let Some(secs) = env_parse::<u64>("RELAY_RATE_WINDOW_SECS")? {
            config.rate_window = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("RELAY_FLUSH_INTERVAL_MS")? {
            config.flush_interval = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<usize>("RELAY_MAX_BATCH")? {
            config.max_batch_size = n;
        }
        if let Ok(secret) = env::var("RELAY_ADMIN_SECRET") {
            if !secret.is_empty() {
                config.admin_secret = Some(secret);
            }
        }
        if let Ok(text) = env::var("RELAY_ANNOUNCEMENT") {
            config.announcement = text;
        }
        if let Some(flag) = env_parse::<bool>("RELAY_TRUST_FORWARDED_FOR")? {
            config.trust_forwarded_for = flag;
        }

        Ok(config)
    }

    /// Reject values the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_recent == 0 {
            return Err(RelayError::Config("max_recent must be at least 1".into()));
        }
        if self.max_text_chars == 0 {
            return Err(RelayError::Config("max_text_chars must be at least 1".into()));
        }
        if self.flush_interval.is_zero() {
            return Err(RelayError::Config("flush_interval must be positive".into()));
        }
        if self.flush_interval > MAX_FLUSH_INTERVAL {
            return Err(RelayError::Config(format!(
                "flush_interval must be at most {}s",
                MAX_FLUSH_INTERVAL.as_secs()
            )));
        }
        if self.rate_window > MAX_RATE_WINDOW {
            return Err(RelayError::Config(format!(
                "rate_window must be at most {}s",
                MAX_RATE_WINDOW.as_secs()
            )));
        }
        if self.max_batch_size == 0 {
            return Err(RelayError::Config("max_batch_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Get path to the durable log
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }

    /// Idle time after which a client's rate-limit entry is forgotten
    pub fn rate_limit_retention(&self) -> Duration {
        self.rate_window
            .checked_mul(crate::store::RATE_LIMIT_RETENTION_FACTOR)
            .unwrap_or(Duration::MAX)
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RelayError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}
