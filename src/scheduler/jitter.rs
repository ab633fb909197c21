//! Human-like timing on top of deterministic cooldowns.
//!
//! Every session owns its own scheduler and random source, so two sessions
//! with the same cooldown expiry draw independent offsets and drift apart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::action::{ActionKind, GamePlan};
use crate::config::{JitterRange, JitterShape, PacingConfig};

/// When an action should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDecision {
    pub kind: ActionKind,
    /// Deterministic eligibility time the offset was drawn for.
    pub base: DateTime<Utc>,
    /// Jittered fire time, never before the moment of the decision.
    pub fire_at: DateTime<Utc>,
}

/// Draws randomized fire times and game pacing.
pub struct JitterScheduler {
    pacing: Arc<PacingConfig>,
    rng: Box<dyn RngCore + Send>,
}

impl JitterScheduler {
    /// Creates a scheduler drawing from `rng`.
    #[must_use]
    pub fn new(pacing: Arc<PacingConfig>, rng: Box<dyn RngCore + Send>) -> Self {
        Self { pacing, rng }
    }

    /// Creates a scheduler seeded from OS entropy.
    #[must_use]
    pub fn from_entropy(pacing: Arc<PacingConfig>) -> Self {
        Self::new(pacing, Box::new(StdRng::from_entropy()))
    }

    /// Creates a reproducible scheduler.
    #[must_use]
    pub fn seeded(pacing: Arc<PacingConfig>, seed: u64) -> Self {
        Self::new(pacing, Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Draws an offset inside `range`, millisecond resolution.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn offset(&mut self, range: &JitterRange) -> TimeDelta {
        let min_ms = range.min_secs.saturating_mul(1000);
        let max_ms = range.max_secs.saturating_mul(1000);
        let span = max_ms.saturating_sub(min_ms).max(0) as f64;

        let unit = match range.shape {
            JitterShape::Uniform => self.unit(),
            JitterShape::Triangular => (self.unit() + self.unit()) / 2.0,
            JitterShape::EarlyBiased => {
                let u = self.unit();
                u * u
            }
        };

        let offset = min_ms.saturating_add((span * unit).round() as i64).min(max_ms);
        TimeDelta::try_milliseconds(offset).unwrap_or(TimeDelta::zero())
    }

    /// Fire time for `kind` becoming eligible at `base`, clamped to `now`.
    ///
    /// The offset is never negative, so the fire time is never before `base`.
    pub fn next_fire_time(
        &mut self,
        kind: ActionKind,
        base: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ScheduleDecision {
        let jitter = self.pacing.actions.get(kind).jitter;
        let offset = self.offset(&jitter).max(TimeDelta::zero());
        let fire_at = (base + offset).max(now);
        ScheduleDecision {
            kind,
            base,
            fire_at,
        }
    }

    /// Delay before a session's first action.
    pub fn startup_delay(&mut self) -> Duration {
        let range = self.pacing.startup_jitter;
        self.offset(&range).to_std().unwrap_or(Duration::ZERO)
    }

    /// Randomized duration and score of one game.
    pub fn plan_game(&mut self) -> GamePlan {
        let game = self.pacing.game;
        let duration = self.offset(&game.duration).to_std().unwrap_or(Duration::ZERO);
        let points = self.rng.gen_range(game.points.min..=game.points.max);
        GamePlan { duration, points }
    }

    fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

impl std::fmt::Debug for JitterScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitterScheduler").finish_non_exhaustive()
    }
}
