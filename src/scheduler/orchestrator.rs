//! Orchestrator: one supervised worker per session.
//!
//! Each session gets a supervisor task that authenticates it, runs its
//! worker and restarts the worker if it panics. Sessions share nothing but
//! the pacing snapshot and the shutdown token; a failing session is reported
//! and the others keep running.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, warn};

use super::{
    Clock, SessionError, SessionView, SessionWorker, SystemClock, WorkerContext, WorkerExit,
    WorkerPhase, WorkerReport,
};
use crate::action::{AuthError, SessionConnector};
use crate::config::{PacingConfig, SessionIdentity};

/// Mixed into the seed of restarted workers.
const RESTART_SEED_STRIDE: u64 = 1 << 32;

/// Lifecycle notifications from the supervisors.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session obtained an authenticated client.
    Authenticated { name: String },
    /// The session could not authenticate and will not run.
    AuthFailed { name: String, error: AuthError },
    /// The worker panicked and was started again.
    Restarted { name: String, attempt: u32 },
    /// The worker exited for good.
    Terminated { name: String, exit: WorkerExit },
}

impl SessionEvent {
    /// Session the event is about.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Authenticated { name }
            | Self::AuthFailed { name, .. }
            | Self::Restarted { name, .. }
            | Self::Terminated { name, .. } => name,
        }
    }
}

struct Slot {
    name: String,
    view: watch::Receiver<SessionView>,
    handle: AbortOnDropHandle<WorkerReport>,
}

/// Owns and supervises every session worker.
pub struct Orchestrator<K: SessionConnector> {
    connector: Arc<K>,
    pacing: Arc<PacingConfig>,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
    cancel: CancellationToken,
    slots: Vec<Slot>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    pending: VecDeque<SessionEvent>,
}

impl<K: SessionConnector> Orchestrator<K> {
    /// Creates an orchestrator over an immutable pacing snapshot.
    #[must_use]
    pub fn new(connector: K, pacing: Arc<PacingConfig>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            pacing,
            clock: Arc::new(SystemClock),
            seed: None,
            cancel: CancellationToken::new(),
            slots: Vec::new(),
            events_tx,
            events_rx,
            pending: VecDeque::new(),
        }
    }

    /// Replaces the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Makes every session reproducible: session `i` is seeded with `seed + i`.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Spawns one supervised worker per identity.
    pub fn start(&mut self, identities: impl IntoIterator<Item = SessionIdentity>) {
        for identity in identities {
            let index = self.slots.len() as u64;
            let name = identity.name.clone();
            let (status, view) = watch::channel(SessionView::new(self.clock.now()));

            let supervisor = Supervisor {
                identity,
                connector: Arc::clone(&self.connector),
                ctx: WorkerContext {
                    pacing: Arc::clone(&self.pacing),
                    clock: Arc::clone(&self.clock),
                    cancel: self.cancel.child_token(),
                    status: Arc::new(status),
                    seed: self.seed.map(|seed| seed.wrapping_add(index)),
                },
                events: self.events_tx.clone(),
                max_restarts: self.pacing.max_restarts,
            };

            let handle = AbortOnDropHandle::new(tokio::spawn(supervisor.run()));
            self.slots.push(Slot { name, view, handle });
        }
        info!("Started {} session(s)", self.slots.len());
    }

    /// Next lifecycle event.
    ///
    /// Returns `None` only if every supervisor is gone and the queue is empty.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        self.events_rx.recv().await
    }

    /// Waits until every started session has either authenticated or failed
    /// to, and returns how many authenticated.
    ///
    /// Other events received meanwhile stay queued for [`Self::next_event`].
    pub async fn wait_for_authentication(&mut self) -> usize {
        let mut decided = HashSet::new();
        let mut authenticated = 0;
        let mut deferred = VecDeque::new();

        while decided.len() < self.slots.len() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            match &event {
                SessionEvent::Authenticated { name } => {
                    if decided.insert(name.clone()) {
                        authenticated += 1;
                    }
                }
                SessionEvent::AuthFailed { name, .. } => {
                    decided.insert(name.clone());
                }
                SessionEvent::Terminated { name, .. } => {
                    decided.insert(name.clone());
                }
                SessionEvent::Restarted { .. } => {}
            }
            deferred.push_back(event);
        }

        self.pending.extend(deferred);
        authenticated
    }

    /// Number of sessions whose worker has not terminated.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.view.borrow().phase != WorkerPhase::Terminated)
            .count()
    }

    /// Latest published view of every session.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, SessionView)> {
        self.slots
            .iter()
            .map(|slot| (slot.name.clone(), slot.view.borrow().clone()))
            .collect()
    }

    /// Signals every worker to stop and collects their reports.
    ///
    /// Workers still running when the grace period ends are aborted.
    pub async fn shutdown(self) -> Vec<WorkerReport> {
        let grace = self.pacing.shutdown_grace();
        info!("Shutting down {} session(s), grace {}s", self.slots.len(), grace.as_secs());
        self.cancel.cancel();

        let deadline = Instant::now() + grace;
        let mut reports = Vec::with_capacity(self.slots.len());

        for slot in self.slots {
            let report = match tokio::time::timeout_at(deadline, slot.handle).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    error!("Supervisor of '{}' failed: {}", slot.name, e);
                    report_from_view(slot.name, &slot.view, WorkerExit::Crashed)
                }
                Err(_) => {
                    warn!("Session '{}' did not stop in time, aborted", slot.name);
                    report_from_view(slot.name, &slot.view, WorkerExit::Aborted)
                }
            };
            reports.push(report);
        }

        reports
    }
}

impl<K: SessionConnector> std::fmt::Debug for Orchestrator<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sessions", &self.slots.len())
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

fn report_from_view(name: String, view: &watch::Receiver<SessionView>, exit: WorkerExit) -> WorkerReport {
    WorkerReport {
        name,
        exit,
        state: view.borrow().state.clone(),
        actions_run: 0,
    }
}

/// Authenticates one session and keeps its worker alive.
struct Supervisor<K: SessionConnector> {
    identity: SessionIdentity,
    connector: Arc<K>,
    ctx: WorkerContext,
    events: mpsc::UnboundedSender<SessionEvent>,
    max_restarts: u32,
}

impl<K: SessionConnector> Supervisor<K> {
    async fn run(self) -> WorkerReport {
        let name = self.identity.name.clone();
        let mut restarts = 0u32;

        loop {
            let client = match self.connect().await {
                Ok(client) => client,
                Err(None) => return self.stop(WorkerExit::Shutdown),
                Err(Some(e)) => {
                    error!("Session '{}' failed to authenticate: {}", name, e);
                    if restarts == 0 {
                        self.emit(SessionEvent::AuthFailed {
                            name: name.clone(),
                            error: e.clone(),
                        });
                    }
                    return self.stop(WorkerExit::Fatal(SessionError::Auth(e)));
                }
            };

            if restarts == 0 {
                info!("Session '{}' authenticated", name);
                self.emit(SessionEvent::Authenticated { name: name.clone() });
            }

            let mut ctx = self.ctx.clone();
            ctx.seed = ctx
                .seed
                .map(|seed| seed.wrapping_add(RESTART_SEED_STRIDE.wrapping_mul(u64::from(restarts))));
            let state = self.ctx.status.borrow().state.clone();
            let worker = SessionWorker::new(name.clone(), client, &ctx).with_state(state);

            match AbortOnDropHandle::new(tokio::spawn(worker.run())).await {
                Ok(report) => {
                    self.emit(SessionEvent::Terminated {
                        name: name.clone(),
                        exit: report.exit.clone(),
                    });
                    return report;
                }
                Err(e) if e.is_panic() && restarts < self.max_restarts => {
                    restarts += 1;
                    warn!(
                        "Worker of '{}' panicked, restarting ({}/{})",
                        name, restarts, self.max_restarts
                    );
                    self.emit(SessionEvent::Restarted {
                        name: name.clone(),
                        attempt: restarts,
                    });
                }
                Err(e) if e.is_panic() => {
                    error!("Worker of '{}' panicked {} times, giving up", name, restarts + 1);
                    return self.stop(WorkerExit::Crashed);
                }
                Err(_) => return self.stop(WorkerExit::Aborted),
            }
        }
    }

    /// Connects unless shutdown comes first (`Err(None)`).
    ///
    /// The handshake runs in its own task so a hang or a panic inside the
    /// connector fails this session only.
    async fn connect(&self) -> Result<K::Client, Option<AuthError>> {
        let connector = Arc::clone(&self.connector);
        let identity = self.identity.clone();
        let attempt = AbortOnDropHandle::new(tokio::spawn(async move {
            connector.connect(&identity).await
        }));
        let limit = self.ctx.pacing.auth_timeout();

        tokio::select! {
            biased;
            () = self.ctx.cancel.cancelled() => Err(None),
            result = tokio::time::timeout(limit, attempt) => match result {
                Ok(Ok(connected)) => connected.map_err(Some),
                Ok(Err(e)) => Err(Some(AuthError::Crashed(e.to_string()))),
                Err(_) => Err(Some(AuthError::TimedOut { secs: limit.as_secs() })),
            },
        }
    }

    fn emit(&self, event: SessionEvent) {
        // The receiver lives as long as the orchestrator.
        let _ = self.events.send(event);
    }

    fn stop(&self, exit: WorkerExit) -> WorkerReport {
        self.ctx.status.send_modify(|view| view.phase = WorkerPhase::Terminated);
        self.emit(SessionEvent::Terminated {
            name: self.identity.name.clone(),
            exit: exit.clone(),
        });
        WorkerReport {
            name: self.identity.name.clone(),
            exit,
            state: self.ctx.status.borrow().state.clone(),
            actions_run: 0,
        }
    }
}
