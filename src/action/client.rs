//! Seams between the scheduler and the remote service.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{ActionKind, Outcome};
use crate::config::SessionIdentity;

/// Errors that prevent a session from obtaining an authenticated handle.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Telegram session '{session}' is not authorized (run with --login {session})")]
    NotAuthorized { session: String },

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Mini-app rejected the login: {0}")]
    LoginRejected(String),

    #[error("Failed to build transport: {0}")]
    Transport(String),

    #[error("Authentication did not finish within {secs}s")]
    TimedOut { secs: u64 },

    #[error("Authentication task failed: {0}")]
    Crashed(String),
}

/// Read-only view of the session state handed to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    /// Last known balance.
    pub balance: f64,
    /// Last known ticket count.
    pub tickets: u32,
    /// Last known end of the farming period.
    pub farming_ends_at: Option<DateTime<Utc>>,
    /// When the state was last fetched.
    pub last_fetch: Option<DateTime<Utc>>,
}

/// Randomized shape of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamePlan {
    /// How long to "play" between starting and claiming.
    pub duration: Duration,
    /// Points to report when claiming.
    pub points: u32,
}

/// Per-invocation input to an [`ActionClient`].
#[derive(Debug, Clone)]
pub struct ActionParams {
    /// Latest known session state.
    pub snapshot: StateSnapshot,
    /// Game pacing, set for [`ActionKind::PlayGame`] only.
    pub game: Option<GamePlan>,
    /// Fires on shutdown; long in-action waits abort on it.
    pub cancel: CancellationToken,
}

/// Performs one logical operation against the remote service.
///
/// Implementations issue no hidden retries and must bound every call with a
/// timeout; retries belong to the state machine.
pub trait ActionClient: Send {
    /// Runs `kind` once and classifies the result.
    fn invoke(
        &mut self,
        kind: ActionKind,
        params: &ActionParams,
    ) -> impl Future<Output = Outcome> + Send;
}

/// Turns a session identity into an authenticated [`ActionClient`].
pub trait SessionConnector: Send + Sync + 'static {
    /// Client produced for each session.
    type Client: ActionClient + 'static;

    /// Authenticates `identity` and returns its client.
    fn connect(
        &self,
        identity: &SessionIdentity,
    ) -> impl Future<Output = Result<Self::Client, AuthError>> + Send;
}
