//! Action state machine.
//!
//! Decides which actions may fire and how each outcome moves an action
//! between `Eligible`, `Cooling`, `Exhausted` and `Failed`:
//!
//! - success → `Cooling(now + cooldown)`, or `Exhausted(next daily boundary)`
//!   for the daily claim; a state fetch goes straight back to `Eligible`
//! - unavailable until `T` → `Cooling(T)`
//! - transient error → `Failed(now + backoff(attempt))`
//! - permanent error → session-fatal, status untouched

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::backoff::Backoff;
use super::clock::next_daily_boundary;
use super::{ActionStatus, SessionError, SessionRuntimeState};
use crate::action::{ActionKind, Dependency, ErrorClass, Outcome};
use crate::config::PacingConfig;

/// Per-session transition rules plus the backoff random source.
pub struct ActionStateMachine {
    pacing: Arc<PacingConfig>,
    backoff: Backoff,
    rng: Box<dyn RngCore + Send>,
}

impl ActionStateMachine {
    /// Creates a state machine drawing backoff jitter from `rng`.
    #[must_use]
    pub fn new(pacing: Arc<PacingConfig>, rng: Box<dyn RngCore + Send>) -> Self {
        let backoff = Backoff::from_config(&pacing.backoff);
        Self {
            pacing,
            backoff,
            rng,
        }
    }

    /// Creates a state machine seeded from OS entropy.
    #[must_use]
    pub fn from_entropy(pacing: Arc<PacingConfig>) -> Self {
        Self::new(pacing, Box::new(StdRng::from_entropy()))
    }

    /// Creates a reproducible state machine.
    #[must_use]
    pub fn seeded(pacing: Arc<PacingConfig>, seed: u64) -> Self {
        Self::new(pacing, Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Backoff policy in use.
    #[must_use]
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Turns expired cooldowns into `Eligible`, dated at their deadline.
    ///
    /// `Failed` is left alone so the attempt count survives until the retry.
    pub fn resolve(&self, state: &mut SessionRuntimeState, now: DateTime<Utc>) {
        for kind in ActionKind::ALL {
            if let ActionStatus::Cooling { until } | ActionStatus::Exhausted { until } =
                state.status(kind)
                && until <= now
            {
                state.set_status(kind, ActionStatus::Eligible, until);
            }
        }
    }

    /// Whether the latest known values allow `kind` to fire.
    #[must_use]
    pub fn dependency_satisfied(
        &self,
        state: &SessionRuntimeState,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> bool {
        if kind == ActionKind::FetchState {
            return state.is_stale(now, self.pacing.state_refresh());
        }
        match kind.dependency() {
            Dependency::None => true,
            Dependency::FreshState => !state.is_stale(now, self.pacing.state_refresh()),
            Dependency::Tickets => state.tickets > 0,
        }
    }

    /// Every kind whose status allows firing and whose dependency holds.
    #[must_use]
    pub fn eligible_actions(
        &self,
        state: &SessionRuntimeState,
        now: DateTime<Utc>,
    ) -> BTreeSet<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|&kind| state.status(kind).is_ready(now))
            .filter(|&kind| self.dependency_satisfied(state, kind, now))
            .collect()
    }

    /// Deterministic time at which `kind` becomes eligible, before jitter.
    ///
    /// `None` means only new data (a fetch reporting tickets) can unblock it.
    #[must_use]
    pub fn ready_at(&self, state: &SessionRuntimeState, kind: ActionKind) -> Option<DateTime<Utc>> {
        let entry = state.entry(kind);
        if let Some(deadline) = entry.status.deadline() {
            return Some(deadline);
        }

        match kind {
            ActionKind::FetchState => Some(
                state
                    .stale_at(self.pacing.state_refresh())
                    .map_or(entry.since, |at| at.max(entry.since)),
            ),
            ActionKind::PlayGame if state.tickets == 0 => None,
            _ => Some(entry.since),
        }
    }

    /// Applies an outcome of `kind` observed at `now`.
    ///
    /// Returns the new status, or the session-fatal error for permanent
    /// failures.
    pub fn record_outcome(
        &mut self,
        state: &mut SessionRuntimeState,
        kind: ActionKind,
        outcome: &Outcome,
        now: DateTime<Utc>,
    ) -> Result<ActionStatus, SessionError> {
        let status = match outcome {
            Outcome::Success(payload) => {
                state.apply_payload(payload);
                if kind.invalidates_state() {
                    state.mark_stale(now);
                }
                self.after_success(state, kind, payload.next_available_at, now)
            }
            Outcome::Unavailable { retry_at } => {
                let until = if *retry_at > now {
                    *retry_at
                } else {
                    now + self.backoff.base()
                };
                ActionStatus::Cooling { until }
            }
            Outcome::Error {
                class: ErrorClass::Transient,
                ..
            } => {
                let attempt = state.status(kind).attempt().saturating_add(1);
                ActionStatus::Failed {
                    retry_after: now + self.backoff.delay(attempt, &mut self.rng),
                    attempt,
                }
            }
            Outcome::Error {
                class: ErrorClass::Permanent,
                detail,
            } => {
                return Err(SessionError::Permanent {
                    kind,
                    detail: detail.clone(),
                });
            }
        };

        state.set_status(kind, status, now);
        Ok(status)
    }

    fn after_success(
        &self,
        state: &mut SessionRuntimeState,
        kind: ActionKind,
        next_available_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ActionStatus {
        let cooldown_end = now + self.pacing.cooldown(kind);
        match kind {
            ActionKind::FetchState => {
                state.mark_fetched(now);
                ActionStatus::Eligible
            }
            ActionKind::ClaimDaily => ActionStatus::Exhausted {
                until: next_daily_boundary(now, self.pacing.daily_offset_minutes).max(cooldown_end),
            },
            ActionKind::ClaimTimeReward => ActionStatus::Cooling {
                until: next_available_at.filter(|at| *at > now).unwrap_or(cooldown_end),
            },
            ActionKind::ClaimReferral | ActionKind::PlayGame => {
                ActionStatus::Cooling { until: cooldown_end }
            }
        }
    }
}

impl std::fmt::Debug for ActionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionStateMachine")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
