//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The DexScreener feed is unauthenticated, so there are no secrets to
//! resolve; a missing config file falls back to built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub rounds: RoundsConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TerminalConfig {
    pub name: String,
    pub heartbeat_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RoundsConfig {
    /// Full cycle length in seconds. Split into two equal halves.
    pub cycle_secs: u64,
    /// How many settled rounds the ledger retains.
    pub history_limit: usize,
    pub history_file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    /// Token address used for the DexScreener lookup (wrapped SOL).
    pub token_address: String,
    pub cache_ttl_ms: i64,
    pub resync_interval_ms: i64,
    pub volatility: f64,
    pub max_deviation_pct: f64,
    pub reset_threshold: f64,
    pub fallback_price: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            name: "PULSE-001".to_string(),
            heartbeat_secs: 1,
        }
    }
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            cycle_secs: 120,
            history_limit: 5,
            history_file: "round_history.json".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            token_address: "So11111111111111111111111111111111111111112".to_string(),
            cache_ttl_ms: 500,
            resync_interval_ms: 6000,
            volatility: 0.0008,
            max_deviation_pct: 0.005,
            reset_threshold: 1.0,
            fallback_price: 100.0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8787,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            terminal: TerminalConfig::default(),
            rounds: RoundsConfig::default(),
            feed: FeedConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from `path` if the file exists, otherwise return defaults.
    /// A malformed file is still an error — silently ignoring typos in an
    /// existing config would be worse than failing.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.rounds.cycle_secs, 120);
        assert_eq!(cfg.rounds.history_limit, 5);
        assert_eq!(cfg.feed.cache_ttl_ms, 500);
        assert_eq!(cfg.feed.resync_interval_ms, 6000);
        assert!((cfg.feed.volatility - 0.0008).abs() < 1e-12);
        assert!((cfg.feed.max_deviation_pct - 0.005).abs() < 1e-12);
        assert!((cfg.feed.fallback_price - 100.0).abs() < 1e-12);
        assert!(cfg.api.enabled);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [rounds]
            cycle_secs = 10
            history_limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.rounds.cycle_secs, 10);
        assert_eq!(cfg.rounds.history_limit, 3);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.feed.cache_ttl_ms, 500);
        assert_eq!(cfg.terminal.heartbeat_secs, 1);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = AppConfig::load_or_default("/tmp/pulse_no_such_config.toml").unwrap();
        assert_eq!(cfg.rounds.cycle_secs, 120);
    }

    #[test]
    fn test_load_config_file() {
        // This test requires config.toml in the working directory.
        if let Ok(cfg) = AppConfig::load("config.toml") {
            assert_eq!(cfg.terminal.name, "PULSE-001");
            assert_eq!(cfg.rounds.cycle_secs, 120);
            assert_eq!(cfg.rounds.history_limit, 5);
        }
        // If config.toml isn't found, that's acceptable in some test environments
    }
}
