//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `rulehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use rulehub_app::config::EffectConfig;
use rulehub_domain::effect::EffectDescription;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Gateway call timing shared by all effects.
    pub effects: EffectConfig,
    /// Rules loaded at startup.
    pub rules: Vec<RuleConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// A rule bound at startup.
#[derive(Debug, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    /// Apply the effect once right after loading.
    #[serde(default)]
    pub fire_on_start: bool,
    pub effect: EffectDescription,
}

impl Config {
    /// Load configuration from `rulehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("rulehub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RULEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(ms) = env_millis("RULEHUB_ACTION_TIMEOUT_MS") {
            self.effects.action_timeout_ms = ms;
        }
        if let Some(ms) = env_millis("RULEHUB_RETRY_BACKOFF_MS") {
            self.effects.retry_backoff_ms = ms;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.effects.action_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "effects.action_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_millis(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "rulehubd=info,rulehub_app=info,rulehub_adapter_virtual=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
