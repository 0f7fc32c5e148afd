//! Configuration file parser for the merge service.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::{Envelope, FetchOptions, ResolveOptions};
use crate::util::HostPolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,

    /// Number of concurrent feed fetch workers per request.
    pub workers: usize,

    /// Per-feed timeout in seconds, covering the request and the body read.
    pub fetch_timeout_secs: u64,

    /// Timeout in seconds for fetching the feed list behind `source`.
    pub list_timeout_secs: u64,

    /// Maximum accepted size of a single feed or feed list body, in bytes.
    pub max_feed_size: usize,

    /// Length of the trailing window used by the `day` filter, in hours.
    pub day_window_hours: u64,

    /// Title of the merged feed.
    pub feed_title: String,

    /// Description of the merged feed. Synthesized from the source count when unset.
    pub feed_description: Option<String>,

    /// Permit feed and list URLs pointing at localhost or private networks.
    pub allow_private_hosts: bool,

    /// User-Agent header sent with every outbound request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            workers: 20,
            fetch_timeout_secs: 5,
            list_timeout_secs: 10,
            max_feed_size: 10 * 1024 * 1024,
            day_window_hours: 24,
            feed_title: "Merged Feed".to_string(),
            feed_description: None,
            allow_private_hosts: false,
            user_agent: concat!("rssmerge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Upper bound for `day_window_hours` (100 years); keeps date arithmetic in range.
    const MAX_WINDOW_HOURS: u64 = 100 * 366 * 24;

    const KNOWN_KEYS: [&'static str; 10] = [
        "bind",
        "workers",
        "fetch_timeout_secs",
        "list_timeout_secs",
        "max_feed_size",
        "day_window_hours",
        "feed_title",
        "feed_description",
        "allow_private_hosts",
        "user_agent",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Blank input yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            bind = %config.bind,
            workers = config.workers,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn host_policy(&self) -> HostPolicy {
        HostPolicy::from_allow_private(self.allow_private_hosts)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            workers: self.workers.max(1),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_body_size: self.max_feed_size,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            timeout: Duration::from_secs(self.list_timeout_secs),
            max_body_size: self.max_feed_size,
            host_policy: self.host_policy(),
        }
    }

    pub fn envelope(&self) -> Envelope {
        Envelope {
            title: self.feed_title.clone(),
            description: self.feed_description.clone(),
        }
    }

    pub fn day_window(&self) -> chrono::Duration {
        let hours = self.day_window_hours.min(Self::MAX_WINDOW_HOURS);
        chrono::Duration::hours(hours as i64)
    }
}

// ============================================================================
// Tests
// ============================================================================
