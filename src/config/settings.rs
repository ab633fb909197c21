//! Telegram API credentials and configuration errors.

use serde::{Deserialize, Serialize};

/// Telegram API configuration shared by every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub const fn new(api_id: i32, api_hash: String) -> Self {
        Self { api_id, api_hash }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?;
        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        Self::from_parts(&api_id, api_hash)
    }

    fn from_parts(api_id: &str, api_hash: String) -> Result<Self, ConfigError> {
        let api_id: i32 = api_id.trim().parse().map_err(|_| ConfigError::InvalidApiId)?;
        if api_id <= 0 {
            return Err(ConfigError::InvalidApiId);
        }
        if api_hash.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("TG_API_HASH"));
        }
        Ok(Self::new(api_id, api_hash))
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No accounts configured")]
    NoAccounts,

    #[error("Account at index {index} has an empty name")]
    EmptyName { index: usize },

    #[error("Duplicate account name found: {name}")]
    DuplicateName { name: String },

    #[error("Account '{name}' has an invalid proxy: {reason}")]
    InvalidProxy { name: String, reason: String },

    #[error("Invalid pacing parameter '{field}': {reason}")]
    InvalidPacing { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn pacing(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPacing {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
    }

    #[test]
    fn test_from_parts_rejects_bad_id() {
        assert!(matches!(
            TelegramConfig::from_parts("abc", "hash".to_owned()),
            Err(ConfigError::InvalidApiId)
        ));
        assert!(matches!(
            TelegramConfig::from_parts("-5", "hash".to_owned()),
            Err(ConfigError::InvalidApiId)
        ));
    }

    #[test]
    fn test_from_parts_trims_id() {
        let config = TelegramConfig::from_parts(" 42 ", "hash".to_owned()).unwrap();
        assert_eq!(config.api_id, 42);
    }
}
