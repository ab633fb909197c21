//! Exponential backoff for transient action errors.

use chrono::TimeDelta;
use rand::Rng;

use crate::config::BackoffConfig;

/// Exponential backoff with a ceiling and proportional jitter.
///
/// The delay for attempt `n` (1-based) is `base * 2^(n-1)`, plus up to
/// `jitter_ratio` of itself, capped at the ceiling. With a ratio of at most
/// one half the delays never decrease from one attempt to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base_ms: u64,
    ceiling_ms: u64,
    jitter_ratio: f64,
}

impl Backoff {
    /// Creates a backoff from configuration.
    #[must_use]
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self {
            base_ms: config.base_secs.saturating_mul(1000),
            ceiling_ms: config.ceiling_secs.saturating_mul(1000),
            jitter_ratio: config.jitter_ratio.clamp(0.0, 0.5),
        }
    }

    /// Delay of the first attempt, without jitter.
    #[must_use]
    pub fn base(&self) -> TimeDelta {
        ms_delta(self.base_ms)
    }

    /// Upper bound of every delay.
    #[must_use]
    pub fn ceiling(&self) -> TimeDelta {
        ms_delta(self.ceiling_ms)
    }

    fn nominal_ms(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_ms.saturating_mul(factor).min(self.ceiling_ms)
    }

    /// Delay without jitter for `attempt`.
    #[must_use]
    pub fn nominal(&self, attempt: u32) -> TimeDelta {
        ms_delta(self.nominal_ms(attempt))
    }

    /// Jittered delay for `attempt`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> TimeDelta {
        let nominal = self.nominal_ms(attempt);
        let extra = (nominal as f64 * self.jitter_ratio * rng.r#gen::<f64>()) as u64;
        ms_delta(nominal.saturating_add(extra).min(self.ceiling_ms))
    }
}

fn ms_delta(ms: u64) -> TimeDelta {
    TimeDelta::try_milliseconds(i64::try_from(ms).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}
