use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::error::{Result, SlotError};

/// Which document store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `brackets.json` under the state path
    Json,
    /// Lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Ok(StoreBackend::Json),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(SlotError::ConfigValidation {
                message: format!("unknown store backend '{}'", other),
            }),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Directory holding persisted state
    pub state_path: String,
    pub store_backend: StoreBackend,
    /// Reload-and-retry attempts after a version conflict
    pub max_conflict_retries: u32,
    /// Recent events kept by the feed
    pub feed_capacity: usize,
    pub log_level: LevelFilter,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            state_path: "state".to_string(),
            store_backend: StoreBackend::Json,
            max_conflict_retries: 3,
            feed_capacity: 500,
            log_level: LevelFilter::INFO,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, falling back to defaults for absent keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or(&lookup, "HTTP_PORT", defaults.http_port)?,
            state_path: lookup("STATE_PATH").unwrap_or(defaults.state_path),
            store_backend: parse_or(&lookup, "STORE_BACKEND", defaults.store_backend)?,
            max_conflict_retries: parse_or(
                &lookup,
                "MAX_CONFLICT_RETRIES",
                defaults.max_conflict_retries,
            )?,
            feed_capacity: parse_or(&lookup, "FEED_CAPACITY", defaults.feed_capacity)?,
            log_level: parse_or(&lookup, "LOG_LEVEL", defaults.log_level)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            return Err(SlotError::ConfigValidation {
                message: "HTTP_PORT must not be 0".to_string(),
            });
        }
        if self.state_path.trim().is_empty() {
            return Err(SlotError::ConfigValidation {
                message: "STATE_PATH must not be empty".to_string(),
            });
        }
        if self.feed_capacity == 0 {
            return Err(SlotError::ConfigValidation {
                message: "FEED_CAPACITY must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Path of the bracket file for the JSON backend
    pub fn bracket_file(&self) -> String {
        format!("{}/brackets.json", self.state_path)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| SlotError::ConfigValidation {
            message: format!("{} has invalid value '{}'", key, raw),
        }),
    }
}
