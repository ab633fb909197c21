//! Wall-clock sources and calendar helpers.

use chrono::{DateTime, Days, FixedOffset, TimeDelta, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock that advances with tokio's clock.
///
/// Follows `tokio::time::pause`/`advance`, so timing can be simulated
/// without real waits.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    /// Creates a clock reading `origin` now.
    #[must_use]
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
        self.origin + elapsed
    }
}

/// Next daily reset strictly after `now`.
///
/// `offset_minutes` follows the JavaScript convention (minutes west of UTC),
/// so the reset is local midnight of UTC minus that offset.
#[must_use]
pub fn next_daily_boundary(now: DateTime<Utc>, offset_minutes: i32) -> DateTime<Utc> {
    let fallback = now + TimeDelta::days(1);
    let Some(zone) = FixedOffset::west_opt(offset_minutes.saturating_mul(60)) else {
        return fallback;
    };

    now.with_timezone(&zone)
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(zone).single())
        .map_or(fallback, |boundary| boundary.with_timezone(&Utc))
}
