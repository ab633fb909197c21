//! Session worker.
//!
//! One worker drives one session: it asks the state machine what may run,
//! asks the jitter scheduler when, calls the action client and feeds the
//! outcome back. Actions of a session never overlap.
//!
//! Shutdown is observed at the sleep and before each action. An action
//! already in flight is allowed to finish so its outcome is recorded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{
    ActionStateMachine, ActionStatus, Clock, JitterScheduler, ScheduleDecision, SessionError,
    SessionRuntimeState,
};
use crate::action::{ActionClient, ActionKind, ActionParams, ErrorClass, Outcome};
use crate::config::PacingConfig;

/// Offset between the jitter seed and the backoff seed of a session.
const BACKOFF_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// What a worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Deciding, or waiting with nothing scheduled.
    Idle,
    /// Sleeping until the next planned action.
    Scheduled {
        kind: ActionKind,
        fire_at: DateTime<Utc>,
    },
    /// Waiting on the action client.
    Executing { kind: ActionKind },
    /// The worker has exited.
    Terminated,
}

/// Read-only view of a session, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: WorkerPhase,
    pub state: SessionRuntimeState,
}

impl SessionView {
    /// Fresh view of a session that has not started yet.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: WorkerPhase::Idle,
            state: SessionRuntimeState::new(now),
        }
    }
}

/// Why a worker stopped.
#[derive(Debug, Clone)]
pub enum WorkerExit {
    /// Stopped on the shutdown signal.
    Shutdown,
    /// Stopped on a session-fatal error.
    Fatal(SessionError),
    /// Panicked more often than restarts allow.
    Crashed,
    /// Did not stop within the grace period.
    Aborted,
}

impl WorkerExit {
    /// Whether the exit was requested rather than caused by a failure.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// Final report of a worker.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub name: String,
    pub exit: WorkerExit,
    pub state: SessionRuntimeState,
    /// Number of completed action invocations.
    pub actions_run: u64,
}

/// Shared inputs every worker is built from.
#[derive(Clone)]
pub struct WorkerContext {
    pub pacing: Arc<PacingConfig>,
    pub clock: Arc<dyn Clock>,
    pub cancel: CancellationToken,
    pub status: Arc<watch::Sender<SessionView>>,
    /// Fixed seed for reproducible runs; OS entropy otherwise.
    pub seed: Option<u64>,
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
struct Planned {
    ready_at: DateTime<Utc>,
    decision: ScheduleDecision,
}

impl Planned {
    fn due_at(&self) -> DateTime<Utc> {
        self.decision.fire_at.max(self.ready_at)
    }
}

/// Drives one session until shutdown or a fatal error.
pub struct SessionWorker<C> {
    name: String,
    client: C,
    machine: ActionStateMachine,
    jitter: JitterScheduler,
    pacing: Arc<PacingConfig>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    status: Arc<watch::Sender<SessionView>>,
    state: SessionRuntimeState,
    schedule: BTreeMap<ActionKind, Planned>,
    actions_run: u64,
}

impl<C: ActionClient> SessionWorker<C> {
    /// Creates a worker with a fresh runtime state.
    #[must_use]
    pub fn new(name: impl Into<String>, client: C, ctx: &WorkerContext) -> Self {
        let (machine, jitter) = match ctx.seed {
            Some(seed) => (
                ActionStateMachine::seeded(Arc::clone(&ctx.pacing), seed.wrapping_add(BACKOFF_SEED_OFFSET)),
                JitterScheduler::seeded(Arc::clone(&ctx.pacing), seed),
            ),
            None => (
                ActionStateMachine::from_entropy(Arc::clone(&ctx.pacing)),
                JitterScheduler::from_entropy(Arc::clone(&ctx.pacing)),
            ),
        };

        Self {
            name: name.into(),
            client,
            machine,
            jitter,
            pacing: Arc::clone(&ctx.pacing),
            clock: Arc::clone(&ctx.clock),
            cancel: ctx.cancel.clone(),
            status: Arc::clone(&ctx.status),
            state: SessionRuntimeState::new(ctx.clock.now()),
            schedule: BTreeMap::new(),
            actions_run: 0,
        }
    }

    /// Continues from a previously published state.
    #[must_use]
    pub fn with_state(mut self, state: SessionRuntimeState) -> Self {
        self.state = state;
        self
    }

    /// Current runtime state.
    #[must_use]
    pub const fn state(&self) -> &SessionRuntimeState {
        &self.state
    }

    /// Runs the worker loop.
    pub async fn run(self) -> WorkerReport {
        let span = info_span!("session", name = %self.name);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> WorkerReport {
        let delay = self.jitter.startup_delay();
        info!("Worker started, first action in {}s", delay.as_secs());
        self.publish(WorkerPhase::Idle);

        if !sleep_or_cancel(&self.cancel, delay).await {
            return self.finish(WorkerExit::Shutdown);
        }

        loop {
            if self.cancel.is_cancelled() {
                return self.finish(WorkerExit::Shutdown);
            }

            let now = self.clock.now();
            self.machine.resolve(&mut self.state, now);
            self.plan(now);

            if let Some(kind) = self.next_due(now) {
                if let Err(e) = self.execute(kind).await {
                    return self.finish(WorkerExit::Fatal(e));
                }
                continue;
            }

            let wait = match self.next_wakeup(now) {
                Some(planned) => {
                    self.publish(WorkerPhase::Scheduled {
                        kind: planned.decision.kind,
                        fire_at: planned.due_at(),
                    });
                    debug!("Next: {} at {}", planned.decision.kind, planned.due_at().format("%H:%M:%S"));
                    (planned.due_at() - now).to_std().unwrap_or(Duration::ZERO)
                }
                None => {
                    self.publish(WorkerPhase::Idle);
                    self.pacing.state_refresh().to_std().unwrap_or(Duration::from_secs(60))
                }
            };

            if !sleep_or_cancel(&self.cancel, wait).await {
                return self.finish(WorkerExit::Shutdown);
            }
        }
    }

    /// Draws fire times for kinds whose base time changed.
    ///
    /// Nothing but a fetch runs before the first fetch. Kinds blocked on data
    /// from another action are dropped until unblocked, so they get a fresh
    /// offset from the moment they become runnable.
    fn plan(&mut self, now: DateTime<Utc>) {
        let never_fetched = self.state.last_fetch.is_none();
        for kind in ActionKind::ALL {
            let blocked = kind != ActionKind::FetchState
                && (never_fetched || !self.machine.dependency_satisfied(&self.state, kind, now));
            let ready_at = match self.machine.ready_at(&self.state, kind) {
                Some(at) if !blocked => at,
                _ => {
                    self.schedule.remove(&kind);
                    continue;
                }
            };

            if self
                .schedule
                .get(&kind)
                .is_some_and(|planned| planned.ready_at == ready_at)
            {
                continue;
            }

            let decision = self.jitter.next_fire_time(kind, ready_at.max(now), now);
            self.schedule.insert(kind, Planned { ready_at, decision });
        }
    }

    /// Picks the action to run now: a stale fetch first, then the one
    /// that has been waiting longest.
    fn next_due(&self, now: DateTime<Utc>) -> Option<ActionKind> {
        let eligible = self.machine.eligible_actions(&self.state, now);
        self.schedule
            .values()
            .filter(|planned| eligible.contains(&planned.decision.kind) && planned.due_at() <= now)
            .min_by_key(|planned| {
                (
                    planned.decision.kind != ActionKind::FetchState,
                    planned.ready_at,
                    planned.decision.kind,
                )
            })
            .map(|planned| planned.decision.kind)
    }

    fn next_wakeup(&self, now: DateTime<Utc>) -> Option<Planned> {
        self.schedule
            .values()
            .filter(|planned| planned.due_at() > now)
            .min_by_key(|planned| planned.due_at())
            .copied()
    }

    async fn execute(&mut self, kind: ActionKind) -> Result<(), SessionError> {
        let params = ActionParams {
            snapshot: self.state.snapshot(),
            game: (kind == ActionKind::PlayGame).then(|| self.jitter.plan_game()),
            cancel: self.cancel.clone(),
        };

        self.publish(WorkerPhase::Executing { kind });
        debug!("Running {}", kind);

        let outcome = self.invoke_bounded(kind, &params).await;
        self.actions_run += 1;

        let now = self.clock.now();
        let result = self.machine.record_outcome(&mut self.state, kind, &outcome, now);
        self.schedule.remove(&kind);
        self.publish(WorkerPhase::Idle);

        let status = result?;
        log_outcome(kind, &outcome, status);
        Ok(())
    }

    /// Invokes the client within the action's time budget.
    ///
    /// Once shutdown is signalled the call gets at most the HTTP budget to
    /// finish, which the grace period exceeds, so its outcome is always
    /// recorded before the orchestrator gives up on the worker.
    async fn invoke_bounded(&mut self, kind: ActionKind, params: &ActionParams) -> Outcome {
        let limit = self.pacing.action_timeout(kind);
        let budget = self.pacing.request_budget();
        let cancel = self.cancel.clone();
        let hard_stop = async move {
            cancel.cancelled().await;
            tokio::time::sleep(budget).await;
        };

        tokio::select! {
            result = tokio::time::timeout(limit, self.client.invoke(kind, params)) => {
                result.unwrap_or_else(|_| Outcome::transient(format!("timed out after {}s", limit.as_secs())))
            }
            () = hard_stop => Outcome::transient("interrupted by shutdown"),
        }
    }

    fn publish(&self, phase: WorkerPhase) {
        self.status.send_replace(SessionView {
            phase,
            state: self.state.clone(),
        });
    }

    fn finish(self, exit: WorkerExit) -> WorkerReport {
        match &exit {
            WorkerExit::Fatal(e) => error!("Session terminated: {}", e),
            _ => info!("Worker stopped after {} actions", self.actions_run),
        }
        self.publish(WorkerPhase::Terminated);

        WorkerReport {
            name: self.name,
            exit,
            state: self.state,
            actions_run: self.actions_run,
        }
    }
}

/// Sleeps for `duration`; returns `false` if shutdown came first.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

fn log_outcome(kind: ActionKind, outcome: &Outcome, status: ActionStatus) {
    match outcome {
        Outcome::Success(payload) => match &payload.summary {
            Some(summary) => info!("{}: {} ({})", kind, summary, status),
            None => info!("{} succeeded ({})", kind, status),
        },
        Outcome::Unavailable { .. } => info!("{} not available yet, {}", kind, status),
        Outcome::Error {
            class: ErrorClass::Transient,
            detail,
        } => warn!("{} failed: {}, {}", kind, detail, status),
        Outcome::Error { detail, .. } => error!("{} failed: {}", kind, detail),
    }
}

impl<C> std::fmt::Debug for SessionWorker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWorker")
            .field("name", &self.name)
            .field("actions_run", &self.actions_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionPayload, Outcome};
    use crate::scheduler::TokioClock;
    use crate::scheduler::testing::{ScriptedClient, always_succeed, fast_pacing, t0};
    use chrono::TimeDelta;
    use std::sync::atomic::Ordering;

    fn context(pacing: PacingConfig) -> (WorkerContext, watch::Receiver<SessionView>) {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::new(t0()));
        let (tx, rx) = watch::channel(SessionView::new(t0()));
        let ctx = WorkerContext {
            pacing: Arc::new(pacing),
            clock,
            cancel: CancellationToken::new(),
            status: Arc::new(tx),
            seed: Some(7),
        };
        (ctx, rx)
    }

    async fn run_for(worker: SessionWorker<ScriptedClient>, cancel: &CancellationToken, duration: Duration) -> WorkerReport {
        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(duration).await;
        cancel.cancel();
        handle.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_runs_first_and_no_game_without_tickets() {
        let (ctx, _rx) = context(fast_pacing());
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(0));
        let log = client.log();

        let worker = SessionWorker::new("alice", client, &ctx);
        let report = run_for(worker, &ctx.cancel, Duration::from_secs(6 * 3600)).await;

        let kinds = log.kinds();
        assert_eq!(kinds.first(), Some(&ActionKind::FetchState));
        assert!(!kinds.contains(&ActionKind::PlayGame));
        assert!(kinds.contains(&ActionKind::ClaimDaily));
        assert!(kinds.contains(&ActionKind::ClaimTimeReward));
        assert!(matches!(report.exit, WorkerExit::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_reward_waits_for_fresh_state() {
        let (ctx, _rx) = context(fast_pacing());
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(0));
        let log = client.log();

        let worker = SessionWorker::new("alice", client, &ctx);
        run_for(worker, &ctx.cancel, Duration::from_secs(3600)).await;

        let kinds = log.kinds();
        let reward = kinds.iter().position(|k| *k == ActionKind::ClaimTimeReward).unwrap();
        let last_fetch = kinds[..reward]
            .iter()
            .rposition(|k| *k == ActionKind::FetchState)
            .unwrap();
        // Every claim invalidates the state, so none may sit in between.
        assert!(kinds[last_fetch + 1..reward].is_empty(), "{kinds:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_games_played_while_tickets_last() {
        let (ctx, _rx) = context(fast_pacing());
        let mut tickets = 3u32;
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), move |kind, params| match kind {
            ActionKind::FetchState => Outcome::Success(ActionPayload {
                tickets: Some(tickets),
                ..ActionPayload::default()
            }),
            ActionKind::PlayGame => {
                assert!(params.game.is_some());
                assert!(params.snapshot.tickets > 0);
                tickets -= 1;
                Outcome::Success(ActionPayload {
                    tickets: Some(tickets),
                    ..ActionPayload::default()
                })
            }
            _ => Outcome::Success(ActionPayload::default()),
        });
        let log = client.log();

        let worker = SessionWorker::new("alice", client, &ctx);
        let report = run_for(worker, &ctx.cancel, Duration::from_secs(3600)).await;

        assert_eq!(log.times_of(ActionKind::PlayGame).len(), 3);
        assert_eq!(report.state.tickets, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_never_overlap() {
        let (ctx, _rx) = context(fast_pacing());
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(5))
            .with_delay(Duration::from_secs(5));
        let log = client.log();

        let worker = SessionWorker::new("alice", client, &ctx);
        run_for(worker, &ctx.cancel, Duration::from_secs(2 * 3600)).await;

        assert!(log.kinds().len() > 5);
        assert_eq!(log.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_back_off() {
        let (ctx, _rx) = context(fast_pacing());
        let mut respond = always_succeed(0);
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), move |kind, params| {
            if kind == ActionKind::ClaimReferral {
                Outcome::transient("HTTP 503")
            } else {
                respond(kind, params)
            }
        });
        let log = client.log();

        let worker = SessionWorker::new("alice", client, &ctx);
        run_for(worker, &ctx.cancel, Duration::from_secs(4 * 3600)).await;

        let times = log.times_of(ActionKind::ClaimReferral);
        assert!(times.len() >= 5);

        let gaps: Vec<TimeDelta> = times.windows(2).map(|w| w[1] - w[0]).collect();
        for gap in &gaps {
            assert!(*gap >= TimeDelta::seconds(30));
            assert!(*gap <= TimeDelta::seconds(1800 + 2));
        }
        for pair in gaps.windows(2) {
            assert!(pair[1] + TimeDelta::seconds(2) >= pair[0], "{gaps:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_fatal() {
        let (ctx, rx) = context(fast_pacing());
        let mut respond = always_succeed(0);
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), move |kind, params| {
            if kind == ActionKind::ClaimDaily {
                Outcome::permanent("HTTP 403")
            } else {
                respond(kind, params)
            }
        });

        let report = SessionWorker::new("alice", client, &ctx).run().await;

        assert!(matches!(
            report.exit,
            WorkerExit::Fatal(SessionError::Permanent {
                kind: ActionKind::ClaimDaily,
                ..
            })
        ));
        assert_eq!(rx.borrow().phase, WorkerPhase::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_sleep() {
        let mut pacing = fast_pacing();
        pacing.startup_jitter = crate::config::JitterRange::uniform(600, 600);
        let (ctx, rx) = context(pacing);
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(0));
        let log = client.log();

        let report = run_for(SessionWorker::new("alice", client, &ctx), &ctx.cancel, Duration::from_secs(10)).await;

        assert!(matches!(report.exit, WorkerExit::Shutdown));
        assert!(log.kinds().is_empty());
        assert_eq!(rx.borrow().phase, WorkerPhase::Terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_action_recorded_on_shutdown() {
        let (ctx, _rx) = context(fast_pacing());
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(2))
            .with_delay(Duration::from_secs(30));

        let report = run_for(SessionWorker::new("alice", client, &ctx), &ctx.cancel, Duration::from_secs(2)).await;

        assert!(matches!(report.exit, WorkerExit::Shutdown));
        assert_eq!(report.actions_run, 1);
        assert_eq!(report.state.tickets, 2);
        assert!(report.state.last_fetch.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlong_action_recorded_as_transient() {
        let mut pacing = fast_pacing();
        pacing.request_timeout_secs = 2;
        pacing.request_spacing_ms = 0;
        let (ctx, _rx) = context(pacing);
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(2))
            .with_delay(Duration::from_secs(30));

        let report = run_for(SessionWorker::new("alice", client, &ctx), &ctx.cancel, Duration::from_secs(12)).await;

        assert!(matches!(report.exit, WorkerExit::Shutdown));
        assert_eq!(report.actions_run, 1);
        assert!(report.state.last_fetch.is_none());
        assert!(matches!(
            report.state.status(ActionKind::FetchState),
            ActionStatus::Failed { attempt: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_bounds_in_flight_action() {
        let mut pacing = fast_pacing();
        pacing.request_timeout_secs = 60;
        pacing.request_spacing_ms = 0;
        let (ctx, _rx) = context(pacing);
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(2))
            .with_delay(Duration::from_secs(600));

        let handle = tokio::spawn(SessionWorker::new("alice", client, &ctx).run());
        tokio::time::sleep(Duration::from_secs(5)).await;
        let cancelled_at = tokio::time::Instant::now();
        ctx.cancel.cancel();
        let report = handle.await.unwrap();

        // The call would run for ten minutes; shutdown cuts it at the budget.
        assert!(cancelled_at.elapsed() <= Duration::from_secs(241));
        assert!(matches!(report.exit, WorkerExit::Shutdown));
        assert!(matches!(
            report.state.status(ActionKind::FetchState),
            ActionStatus::Failed { attempt: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_from_state() {
        let (ctx, _rx) = context(fast_pacing());
        let client = ScriptedClient::new(Arc::clone(&ctx.clock), always_succeed(0));
        let log = client.log();

        let mut state = SessionRuntimeState::new(t0());
        state.mark_fetched(t0());
        state.set_status(
            ActionKind::ClaimDaily,
            ActionStatus::Exhausted {
                until: t0() + TimeDelta::days(1),
            },
            t0(),
        );

        let worker = SessionWorker::new("alice", client, &ctx).with_state(state);
        run_for(worker, &ctx.cancel, Duration::from_secs(600)).await;

        let kinds = log.kinds();
        assert!(!kinds.contains(&ActionKind::ClaimDaily));
        assert_ne!(kinds.first(), Some(&ActionKind::FetchState));
    }
}
