//! Configuration loading and validation for the reversal trader.
//!
//! Uses serde_yaml to load YAML configuration files. Exchange credentials are
//! never read from the file, only from environment variables.

mod app;
mod duration;
mod error;
mod exchange;
mod replay;
mod storage;
mod strategy;

pub use app::AppConfig;
pub use error::ConfigError;
pub use exchange::ExchangeConfig;
pub use replay::ReplayConfig;
pub use storage::StorageConfig;
pub use strategy::StrategyConfig;

use rust_decimal::Decimal;
use serde::Deserialize;
use std::{env, fs};

use crate::exchanges::split_pair;

/// How the process talks to the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Trades on CEX.io. Credentials are required outside development.
    Live,
    /// Replays recorded tickers. No credentials are needed.
    Replay,
}

/// Largest scale a `Decimal` can hold.
const MAX_SIGNIFICANT_DIGITS: u32 = 28;

/// Root configuration structure.
///
/// Required sections: app, strategy.
/// Optional sections: exchange, storage, replay.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// CEX.io connection settings.
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// The trade to carry out.
    pub strategy: StrategyConfig,
    /// Ticker recording (optional).
    pub storage: Option<StorageConfig>,
    /// Window of recorded tickers used by `--replay` (optional).
    pub replay: Option<ReplayConfig>,
}

impl Config {
    /// Load a live configuration from a YAML file at the given path.
    #[cfg(test)]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_overrides(path, &[], RunMode::Live)
    }

    /// Load configuration and apply `--key=value` strategy overrides before validation.
    ///
    /// First loads environment variables from `.env` file (if exists), then reads
    /// `{PREFIX}_USERNAME`, `{PREFIX}_API_KEY` and `{PREFIX}_API_SECRET`.
    pub fn load_with_overrides(
        path: &str,
        overrides: &[(String, String)],
        mode: RunMode,
    ) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        for (key, value) in overrides {
            config.strategy.apply_override(key, value)?;
        }

        config.load_credentials_from_env();
        config.validate(mode)?;

        Ok(config)
    }

    fn load_credentials_from_env(&mut self) {
        let prefix = self.exchange.env_prefix.to_uppercase();
        let read = |name: &str| env::var(format!("{}_{}", prefix, name)).unwrap_or_default();

        self.exchange.username = read("USERNAME");
        self.exchange.api_key = read("API_KEY");
        self.exchange.api_secret = read("API_SECRET");
    }

    /// Validate the configuration for the given run mode.
    fn validate(&self, mode: RunMode) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        let strategy = &self.strategy;

        if split_pair(&strategy.pair).is_none() {
            return Err(ConfigError::Validation(format!(
                "strategy.pair must look like BASE/QUOTE, got {:?}",
                strategy.pair
            )));
        }

        if strategy.amount <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "strategy.amount must be positive".into(),
            ));
        }

        if strategy.threshold_percent <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "strategy.threshold_percent must be positive".into(),
            ));
        }

        if strategy.order_ttl == 0 {
            return Err(ConfigError::Validation(
                "strategy.order_ttl must be positive".into(),
            ));
        }

        if strategy.significant_digits > MAX_SIGNIFICANT_DIGITS {
            return Err(ConfigError::Validation(format!(
                "strategy.significant_digits must be at most {}",
                MAX_SIGNIFICANT_DIGITS
            )));
        }

        if let Some(ref replay) = self.replay {
            if replay.from > replay.to {
                return Err(ConfigError::Validation(
                    "replay.from must not be after replay.to".into(),
                ));
            }
        }

        if mode == RunMode::Replay {
            if self.replay.is_none() {
                return Err(ConfigError::Validation(
                    "replay mode requires a replay section with from/to".into(),
                ));
            }
            return Ok(());
        }

        // Only require credentials in production/staging
        if self.app.requires_credentials() && self.exchange.missing_credentials() {
            let prefix = self.exchange.env_prefix.to_uppercase();
            return Err(ConfigError::Validation(format!(
                "exchange credentials not found (set {p}_USERNAME, {p}_API_KEY and {p}_API_SECRET env vars)",
                p = prefix
            )));
        }

        Ok(())
    }
}
