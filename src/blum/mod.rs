//! Client of the Blum mini-app API.
//!
//! Logs a Telegram session into the mini-app and performs the farming
//! actions over HTTP.

mod api;
mod client;
mod connector;
mod spacer;
mod types;

pub use api::{ApiError, BlumApi, Endpoints, GAME_API, Service, USER_API};
pub use client::BlumActionClient;
pub use connector::BlumConnector;
pub use spacer::RequestSpacer;
