//! Exchange connection configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Default prefix for credential environment variables.
pub const DEFAULT_ENV_PREFIX: &str = "CEX";

/// Settings for the CEX.io connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// API root override, e.g. a sandbox or a local mock.
    pub base_url: Option<String>,
    /// HTTP request timeout.
    #[serde(default, with = "duration")]
    pub timeout: Duration,
    /// Prefix of the `{PREFIX}_USERNAME`, `{PREFIX}_API_KEY`, `{PREFIX}_API_SECRET` variables.
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    /// Account identifier (loaded from environment variable).
    #[serde(skip)]
    pub username: String,
    /// API key (loaded from environment variable).
    #[serde(skip)]
    pub api_key: String,
    /// API secret (loaded from environment variable).
    #[serde(skip)]
    pub api_secret: String,
}

impl ExchangeConfig {
    /// Returns true if any credential is missing.
    pub fn missing_credentials(&self) -> bool {
        self.username.is_empty() || self.api_key.is_empty() || self.api_secret.is_empty()
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::ZERO,
            env_prefix: default_env_prefix(),
            username: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}
