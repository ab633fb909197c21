//! Telegram client wrapper module.
//!
//! Provides per-account user sessions: interactive login and retrieval of
//! the mini-app init data.

mod client;

pub use client::{TelegramError, TelegramSession, extract_init_data, mask_phone};
pub use grammers_client::client::{LoginToken, PasswordToken};
