//! Configuration module for the farming bot.
//!
//! Handles loading, validation, and management of the accounts file,
//! the pacing parameters and the Telegram API credentials.

mod accounts;
mod pacing;
mod settings;

pub use accounts::{FarmConfig, ProxyConfig, SessionIdentity};
pub use pacing::{
    ActionPacing, ActionTable, BackoffConfig, GameConfig, JitterRange, JitterShape,
    MAX_REQUESTS_PER_ACTION, PacingConfig, PointsRange,
};
pub use settings::{ConfigError, TelegramConfig};

/// Username of the mini-app bot.
pub const APP_BOT_USERNAME: &str = "BlumCryptoBot";

/// URL the mini-app web view is opened with.
pub const APP_URL: &str = "https://telegram.blum.codes/";
