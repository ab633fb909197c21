//! Timing parameters: cooldowns, jitter windows, backoff and timeouts.
//!
//! These are product-tuning knobs. Every field has a default so a minimal
//! accounts file only needs the account list.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::action::ActionKind;

/// Shape of the random offset drawn inside a [`JitterRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterShape {
    /// Every offset in the window is equally likely.
    #[default]
    Uniform,
    /// Offsets cluster around the middle of the window.
    Triangular,
    /// Offsets cluster near the start of the window, with a long tail.
    EarlyBiased,
}

/// Random offset window in seconds, added after a deterministic time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitterRange {
    pub min_secs: i64,
    pub max_secs: i64,
    #[serde(default)]
    pub shape: JitterShape,
}

impl JitterRange {
    /// Creates a new window.
    #[must_use]
    pub const fn new(min_secs: i64, max_secs: i64, shape: JitterShape) -> Self {
        Self {
            min_secs,
            max_secs,
            shape,
        }
    }

    /// Creates a uniform window.
    #[must_use]
    pub const fn uniform(min_secs: i64, max_secs: i64) -> Self {
        Self::new(min_secs, max_secs, JitterShape::Uniform)
    }

    /// Largest offset this window can produce.
    #[must_use]
    pub fn max_offset(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.max_secs).unwrap_or(TimeDelta::MAX)
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.min_secs < 0 {
            return Err(ConfigError::pacing(field, "min_secs must not be negative"));
        }
        if self.min_secs > self.max_secs {
            return Err(ConfigError::pacing(
                field,
                format!("min_secs {} > max_secs {}", self.min_secs, self.max_secs),
            ));
        }
        Ok(())
    }
}

/// Most HTTP requests one action makes: a token refresh plus three calls.
pub const MAX_REQUESTS_PER_ACTION: u32 = 4;

/// Cooldown and jitter of one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPacing {
    /// Nominal cooldown after a success.
    pub cooldown_secs: u64,
    /// Random offset added on top of every cooldown expiry.
    pub jitter: JitterRange,
}

impl ActionPacing {
    const fn new(cooldown_secs: u64, jitter: JitterRange) -> Self {
        Self {
            cooldown_secs,
            jitter,
        }
    }

    /// Nominal cooldown as a time delta.
    #[must_use]
    pub fn cooldown(&self) -> TimeDelta {
        secs_delta(self.cooldown_secs)
    }
}

/// Pacing for every [`ActionKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTable {
    /// Cooldown doubles as the state refresh interval.
    #[serde(default = "default_fetch_state")]
    pub fetch_state: ActionPacing,
    /// Cooldown is the minimum gap after a claim; the daily boundary usually dominates.
    #[serde(default = "default_claim_daily")]
    pub claim_daily: ActionPacing,
    /// Cooldown applies when the server reports no farming end.
    #[serde(default = "default_claim_time_reward")]
    pub claim_time_reward: ActionPacing,
    #[serde(default = "default_claim_referral")]
    pub claim_referral: ActionPacing,
    /// Cooldown is the pause between two games.
    #[serde(default = "default_play_game")]
    pub play_game: ActionPacing,
}

impl ActionTable {
    /// Returns the pacing of `kind`.
    #[must_use]
    pub const fn get(&self, kind: ActionKind) -> &ActionPacing {
        match kind {
            ActionKind::FetchState => &self.fetch_state,
            ActionKind::ClaimDaily => &self.claim_daily,
            ActionKind::ClaimTimeReward => &self.claim_time_reward,
            ActionKind::ClaimReferral => &self.claim_referral,
            ActionKind::PlayGame => &self.play_game,
        }
    }

    /// Returns the pacing of `kind` for modification.
    pub fn get_mut(&mut self, kind: ActionKind) -> &mut ActionPacing {
        match kind {
            ActionKind::FetchState => &mut self.fetch_state,
            ActionKind::ClaimDaily => &mut self.claim_daily,
            ActionKind::ClaimTimeReward => &mut self.claim_time_reward,
            ActionKind::ClaimReferral => &mut self.claim_referral,
            ActionKind::PlayGame => &mut self.play_game,
        }
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self {
            fetch_state: default_fetch_state(),
            claim_daily: default_claim_daily(),
            claim_time_reward: default_claim_time_reward(),
            claim_referral: default_claim_referral(),
            play_game: default_play_game(),
        }
    }
}

const fn default_fetch_state() -> ActionPacing {
    ActionPacing::new(1200, JitterRange::new(5, 120, JitterShape::Triangular))
}

const fn default_claim_daily() -> ActionPacing {
    ActionPacing::new(3600, JitterRange::uniform(120, 1800))
}

const fn default_claim_time_reward() -> ActionPacing {
    ActionPacing::new(28_800, JitterRange::uniform(60, 900))
}

const fn default_claim_referral() -> ActionPacing {
    ActionPacing::new(28_800, JitterRange::uniform(60, 1200))
}

const fn default_play_game() -> ActionPacing {
    ActionPacing::new(2, JitterRange::new(1, 6, JitterShape::EarlyBiased))
}

/// Inclusive range of points reported for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRange {
    pub min: u32,
    pub max: u32,
}

/// Intra-game pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seconds between starting and claiming a game.
    #[serde(default = "default_game_duration")]
    pub duration: JitterRange,
    #[serde(default = "default_game_points")]
    pub points: PointsRange,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            duration: default_game_duration(),
            points: default_game_points(),
        }
    }
}

const fn default_game_duration() -> JitterRange {
    JitterRange::new(30, 40, JitterShape::Triangular)
}

const fn default_game_points() -> PointsRange {
    PointsRange { min: 180, max: 230 }
}

/// Exponential backoff after transient errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub base_secs: u64,
    /// Upper bound of any delay, jitter included.
    pub ceiling_secs: u64,
    /// Extra random delay as a fraction of the exponential delay, in `[0, 0.5]`.
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: 30,
            ceiling_secs: 1800,
            jitter_ratio: 0.25,
        }
    }
}

/// Every timing parameter of the scheduler, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay before a session's first action.
    #[serde(default = "default_startup_jitter")]
    pub startup_jitter: JitterRange,

    /// Timezone offset in minutes (JavaScript convention: UTC-7 is 420) sent
    /// to the daily reward endpoint; also defines the daily boundary.
    #[serde(default = "default_daily_offset")]
    pub daily_offset_minutes: i32,

    #[serde(default)]
    pub actions: ActionTable,

    #[serde(default)]
    pub game: GameConfig,

    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Bound on a single HTTP request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Minimum gap between two HTTP requests of one session.
    #[serde(default = "default_request_spacing")]
    pub request_spacing_ms: u64,

    /// How long shutdown waits for workers before aborting them.
    /// Must exceed the HTTP budget of one action.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Bound on authenticating one session (Telegram and mini-app login).
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,

    /// How often a panicking worker is restarted.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

const fn default_startup_jitter() -> JitterRange {
    JitterRange::uniform(30, 600)
}

const fn default_daily_offset() -> i32 {
    420
}

const fn default_request_timeout() -> u64 {
    20
}

const fn default_request_spacing() -> u64 {
    1000
}

const fn default_shutdown_grace() -> u64 {
    120
}

const fn default_auth_timeout() -> u64 {
    90
}

const fn default_max_restarts() -> u32 {
    3
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            startup_jitter: default_startup_jitter(),
            daily_offset_minutes: default_daily_offset(),
            actions: ActionTable::default(),
            game: GameConfig::default(),
            backoff: BackoffConfig::default(),
            request_timeout_secs: default_request_timeout(),
            request_spacing_ms: default_request_spacing(),
            shutdown_grace_secs: default_shutdown_grace(),
            auth_timeout_secs: default_auth_timeout(),
            max_restarts: default_max_restarts(),
        }
    }
}

impl PacingConfig {
    /// Validates every parameter.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.startup_jitter.validate("startup_jitter")?;

        for kind in ActionKind::ALL {
            self.actions
                .get(kind)
                .jitter
                .validate(&format!("actions.{kind}.jitter"))?;
        }

        self.game.duration.validate("game.duration")?;
        if self.game.points.min > self.game.points.max {
            return Err(ConfigError::pacing("game.points", "min > max"));
        }

        let backoff = &self.backoff;
        if backoff.base_secs == 0 {
            return Err(ConfigError::pacing("backoff.base_secs", "must be > 0"));
        }
        if backoff.ceiling_secs < backoff.base_secs {
            return Err(ConfigError::pacing(
                "backoff.ceiling_secs",
                "must not be below base_secs",
            ));
        }
        if !(0.0..=0.5).contains(&backoff.jitter_ratio) {
            return Err(ConfigError::pacing(
                "backoff.jitter_ratio",
                "must be within [0, 0.5]",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::pacing("request_timeout_secs", "must be > 0"));
        }
        if self.shutdown_grace() <= self.request_budget() {
            return Err(ConfigError::pacing(
                "shutdown_grace_secs",
                format!(
                    "must exceed the HTTP budget of one action ({}s)",
                    self.request_budget().as_secs()
                ),
            ));
        }
        if self.auth_timeout_secs == 0 {
            return Err(ConfigError::pacing("auth_timeout_secs", "must be > 0"));
        }
        if !(-14 * 60..=14 * 60).contains(&self.daily_offset_minutes) {
            return Err(ConfigError::pacing(
                "daily_offset_minutes",
                "must be within [-840, 840]",
            ));
        }

        Ok(())
    }

    /// Nominal cooldown of `kind`.
    #[must_use]
    pub fn cooldown(&self, kind: ActionKind) -> TimeDelta {
        self.actions.get(kind).cooldown()
    }

    /// How long a state fetch stays fresh.
    #[must_use]
    pub fn state_refresh(&self) -> TimeDelta {
        self.actions.fetch_state.cooldown()
    }

    /// Timeout of a single HTTP request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Minimum gap between two HTTP requests of one session.
    #[must_use]
    pub const fn request_spacing(&self) -> Duration {
        Duration::from_millis(self.request_spacing_ms)
    }

    /// Shutdown grace period.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Bound on authenticating one session.
    #[must_use]
    pub const fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Longest time the HTTP requests of one action can take.
    #[must_use]
    pub fn request_budget(&self) -> Duration {
        (self.request_timeout() + self.request_spacing()) * MAX_REQUESTS_PER_ACTION
    }

    /// Bound on one invocation of `kind`, game play included.
    #[must_use]
    pub fn action_timeout(&self, kind: ActionKind) -> Duration {
        let play = match kind {
            ActionKind::PlayGame => self.game.duration.max_offset().to_std().unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        };
        self.request_budget() + play
    }
}

/// Converts whole seconds to a delta, saturating at `i64::MAX` seconds.
pub(crate) fn secs_delta(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}
