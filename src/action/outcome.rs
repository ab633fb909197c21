//! Typed result of one remote action.

use std::fmt;

use chrono::{DateTime, Utc};

/// Whether a failed action may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network failure, timeout, rate limit, malformed response: retry with backoff.
    Transient,
    /// Rejected authorization or request: the session cannot continue.
    Permanent,
}

/// Fields of a successful response the scheduler cares about.
///
/// Every field is optional: an action only reports what it learned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPayload {
    /// Available balance after the action.
    pub balance: Option<f64>,
    /// Tickets (play passes) left after the action.
    pub tickets: Option<u32>,
    /// When the current farming period ends.
    pub farming_ends_at: Option<DateTime<Utc>>,
    /// Server-provided time at which this action becomes available again.
    pub next_available_at: Option<DateTime<Utc>>,
    /// Short human-readable summary for logs.
    pub summary: Option<String>,
}

impl ActionPayload {
    /// Creates a payload carrying only a summary.
    #[must_use]
    pub fn summary(text: impl Into<String>) -> Self {
        Self {
            summary: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Three-way classification of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The action went through.
    Success(ActionPayload),
    /// The server says the action is not available before `retry_at`.
    Unavailable { retry_at: DateTime<Utc> },
    /// The action failed.
    Error { class: ErrorClass, detail: String },
}

impl Outcome {
    /// Shorthand for a transient error.
    #[must_use]
    pub fn transient(detail: impl Into<String>) -> Self {
        Self::Error {
            class: ErrorClass::Transient,
            detail: detail.into(),
        }
    }

    /// Shorthand for a permanent error.
    #[must_use]
    pub fn permanent(detail: impl Into<String>) -> Self {
        Self::Error {
            class: ErrorClass::Permanent,
            detail: detail.into(),
        }
    }

    /// Returns true for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(payload) => match &payload.summary {
                Some(summary) => write!(f, "success ({summary})"),
                None => f.write_str("success"),
            },
            Self::Unavailable { retry_at } => write!(f, "unavailable until {retry_at}"),
            Self::Error { class, detail } => write!(f, "{class:?} error: {detail}"),
        }
    }
}
