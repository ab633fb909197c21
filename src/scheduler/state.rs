//! Per-session runtime state.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::action::{ActionKind, ActionPayload, StateSnapshot};

/// Scheduling status of one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// May fire once its dependency is satisfied.
    Eligible,
    /// Waiting out a cooldown.
    Cooling { until: DateTime<Utc> },
    /// Used up for the current daily cycle.
    Exhausted { until: DateTime<Utc> },
    /// Last attempt failed transiently; retry after the backoff.
    Failed {
        retry_after: DateTime<Utc>,
        attempt: u32,
    },
}

impl ActionStatus {
    /// Deadline after which the status no longer blocks, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::Eligible => None,
            Self::Cooling { until } | Self::Exhausted { until } => Some(until),
            Self::Failed { retry_after, .. } => Some(retry_after),
        }
    }

    /// Whether the status allows firing at `now`.
    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.deadline().is_none_or(|deadline| deadline <= now)
    }

    /// Consecutive transient failures so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        match *self {
            Self::Failed { attempt, .. } => attempt,
            _ => 0,
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eligible => f.write_str("eligible"),
            Self::Cooling { until } => write!(f, "cooling until {}", until.format("%H:%M:%S")),
            Self::Exhausted { until } => write!(f, "exhausted until {}", until.format("%Y-%m-%d %H:%M")),
            Self::Failed {
                retry_after,
                attempt,
            } => write!(
                f,
                "failed (attempt {attempt}), retry at {}",
                retry_after.format("%H:%M:%S")
            ),
        }
    }
}

/// A status and the instant it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionEntry {
    pub status: ActionStatus,
    pub since: DateTime<Utc>,
}

/// Mutable state of one session, owned by its worker.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRuntimeState {
    /// Last known balance.
    pub balance: f64,

    /// Last known ticket count.
    pub tickets: u32,

    /// Last known end of the farming period.
    pub farming_ends_at: Option<DateTime<Utc>>,

    /// When the state was last fetched successfully.
    pub last_fetch: Option<DateTime<Utc>>,

    /// Set when an action changed server-side values after the last fetch.
    stale_since: Option<DateTime<Utc>>,

    /// One entry per [`ActionKind`], indexed by discriminant.
    entries: [ActionEntry; ActionKind::ALL.len()],
}

impl SessionRuntimeState {
    /// Creates a state with every action eligible since `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            balance: 0.0,
            tickets: 0,
            farming_ends_at: None,
            last_fetch: None,
            stale_since: None,
            entries: [ActionEntry {
                status: ActionStatus::Eligible,
                since: now,
            }; ActionKind::ALL.len()],
        }
    }

    /// Returns the entry of `kind`.
    #[must_use]
    pub const fn entry(&self, kind: ActionKind) -> ActionEntry {
        self.entries[kind as usize]
    }

    /// Returns the status of `kind`.
    #[must_use]
    pub const fn status(&self, kind: ActionKind) -> ActionStatus {
        self.entry(kind).status
    }

    /// Replaces the status of `kind`.
    pub(crate) fn set_status(&mut self, kind: ActionKind, status: ActionStatus, now: DateTime<Utc>) {
        self.entries[kind as usize] = ActionEntry { status, since: now };
    }

    /// Iterates over every kind with its entry.
    pub fn entries(&self) -> impl Iterator<Item = (ActionKind, ActionEntry)> + '_ {
        ActionKind::ALL.into_iter().map(|kind| (kind, self.entry(kind)))
    }

    /// Instant at which the fetched data stops being fresh.
    #[must_use]
    pub fn stale_at(&self, refresh: TimeDelta) -> Option<DateTime<Utc>> {
        let last_fetch = self.last_fetch?;
        Some(self.stale_since.unwrap_or(last_fetch + refresh))
    }

    /// Whether dependent actions need a new fetch first.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, refresh: TimeDelta) -> bool {
        self.stale_at(refresh).is_none_or(|at| at <= now)
    }

    /// Marks fetched values as outdated, keeping the earliest mark.
    pub(crate) fn mark_stale(&mut self, now: DateTime<Utc>) {
        self.stale_since.get_or_insert(now);
    }

    /// Records a successful fetch at `now`.
    pub(crate) fn mark_fetched(&mut self, now: DateTime<Utc>) {
        self.last_fetch = Some(now);
        self.stale_since = None;
    }

    /// Copies whatever the payload reported into the state.
    pub(crate) fn apply_payload(&mut self, payload: &ActionPayload) {
        if let Some(balance) = payload.balance {
            self.balance = balance;
        }
        if let Some(tickets) = payload.tickets {
            self.tickets = tickets;
        }
        if let Some(ends_at) = payload.farming_ends_at {
            self.farming_ends_at = Some(ends_at);
        }
    }

    /// Read-only copy for the action client.
    #[must_use]
    pub const fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            balance: self.balance,
            tickets: self.tickets,
            farming_ends_at: self.farming_ends_at,
            last_fetch: self.last_fetch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_new_state_all_eligible() {
        let state = SessionRuntimeState::new(t0());
        assert!(state.entries().all(|(_, e)| e.status == ActionStatus::Eligible && e.since == t0()));
        assert_eq!(state.tickets, 0);
    }

    #[test]
    fn test_status_readiness() {
        let later = t0() + TimeDelta::seconds(10);
        assert!(ActionStatus::Eligible.is_ready(t0()));
        assert!(!ActionStatus::Cooling { until: later }.is_ready(t0()));
        assert!(ActionStatus::Cooling { until: later }.is_ready(later));
        let failed = ActionStatus::Failed {
            retry_after: later,
            attempt: 2,
        };
        assert_eq!(failed.attempt(), 2);
        assert!(!failed.is_ready(t0()));
    }

    #[test]
    fn test_staleness() {
        let refresh = TimeDelta::minutes(10);
        let mut state = SessionRuntimeState::new(t0());
        assert!(state.is_stale(t0(), refresh));

        state.mark_fetched(t0());
        assert!(!state.is_stale(t0() + TimeDelta::minutes(5), refresh));
        assert!(state.is_stale(t0() + TimeDelta::minutes(10), refresh));

        state.mark_stale(t0() + TimeDelta::minutes(1));
        state.mark_stale(t0() + TimeDelta::minutes(2));
        assert_eq!(state.stale_at(refresh), Some(t0() + TimeDelta::minutes(1)));

        state.mark_fetched(t0() + TimeDelta::minutes(3));
        assert_eq!(state.stale_at(refresh), Some(t0() + TimeDelta::minutes(13)));
    }

    #[test]
    fn test_apply_payload_keeps_unknown_fields() {
        let mut state = SessionRuntimeState::new(t0());
        state.balance = 10.0;
        state.tickets = 4;
        state.apply_payload(&ActionPayload {
            tickets: Some(3),
            ..ActionPayload::default()
        });
        assert_eq!(state.tickets, 3);
        assert!((state.balance - 10.0).abs() < f64::EPSILON);
    }
}
