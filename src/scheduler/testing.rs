//! Scripted action client shared by scheduler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::action::{ActionClient, ActionKind, ActionParams, ActionPayload, Outcome};
use crate::config::{JitterRange, PacingConfig};

type Responder = Box<dyn FnMut(ActionKind, &ActionParams) -> Outcome + Send>;

/// Calls observed by a [`ScriptedClient`].
#[derive(Debug, Default)]
pub struct CallLog {
    pub calls: Mutex<Vec<(ActionKind, DateTime<Utc>)>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl CallLog {
    pub fn kinds(&self) -> Vec<ActionKind> {
        self.calls.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn times_of(&self, kind: ActionKind) -> Vec<DateTime<Utc>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, at)| *at)
            .collect()
    }
}

/// Answers every call from a closure, optionally after a delay.
pub struct ScriptedClient {
    respond: Responder,
    delay: Duration,
    log: Arc<CallLog>,
    clock: Arc<dyn super::Clock>,
}

impl ScriptedClient {
    pub fn new(
        clock: Arc<dyn super::Clock>,
        respond: impl FnMut(ActionKind, &ActionParams) -> Outcome + Send + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: Duration::ZERO,
            log: Arc::new(CallLog::default()),
            clock,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

impl ActionClient for ScriptedClient {
    fn invoke(
        &mut self,
        kind: ActionKind,
        params: &ActionParams,
    ) -> impl std::future::Future<Output = Outcome> + Send {
        self.log.calls.lock().unwrap().push((kind, self.clock.now()));
        let outcome = (self.respond)(kind, params);
        let log = Arc::clone(&self.log);
        let delay = self.delay;

        async move {
            let now = log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            log.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            log.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }
}

/// Succeeds at everything; a fetch reports `tickets`.
pub fn always_succeed(tickets: u32) -> impl FnMut(ActionKind, &ActionParams) -> Outcome + Send {
    move |kind, _| match kind {
        ActionKind::FetchState => Outcome::Success(ActionPayload {
            balance: Some(1000.0),
            tickets: Some(tickets),
            ..ActionPayload::default()
        }),
        _ => Outcome::Success(ActionPayload::default()),
    }
}

/// Pacing without startup delay and with near-zero jitter.
pub fn fast_pacing() -> PacingConfig {
    let mut pacing = PacingConfig::default();
    pacing.startup_jitter = JitterRange::uniform(0, 0);
    for kind in ActionKind::ALL {
        pacing.actions.get_mut(kind).jitter = JitterRange::uniform(0, 1);
    }
    pacing.game.duration = JitterRange::uniform(0, 0);
    pacing.shutdown_grace_secs = 120;
    pacing
}

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}
