//! Session-fatal errors.

use thiserror::Error;

use crate::action::{ActionKind, AuthError};

/// Errors that end a session's worker.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("{kind} failed permanently: {detail}")]
    Permanent { kind: ActionKind, detail: String },
}
