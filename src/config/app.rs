//! Application-level configuration.

use serde::Deserialize;

/// Environment name under which exchange credentials are optional.
pub const DEVELOPMENT_ENV: &str = "development";

/// Application-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application name used in the startup log.
    pub name: String,
    /// Environment: "development", "staging", or "production".
    #[serde(default = "default_env")]
    pub env: String,
    /// Logging verbosity: "trace", "debug", "info", "warn", "error".
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Returns true unless running in development.
    pub fn requires_credentials(&self) -> bool {
        self.env != DEVELOPMENT_ENV
    }
}

fn default_env() -> String {
    "production".to_string()
}
