//! Blum Farm Bot Library
//!
//! Automates the Blum Telegram mini-app for several accounts at once.
//!
//! This crate provides the core functionality for:
//! - Loading and validating the accounts and pacing configuration
//! - Logging accounts in to Telegram and obtaining mini-app init data
//! - Performing farming actions against the mini-app HTTP API
//! - Scheduling those actions per account with randomized timing

pub mod action;
pub mod blum;
pub mod config;
pub mod scheduler;
pub mod telegram;
