//! Session scheduling.
//!
//! The per-session pieces ([`ActionStateMachine`], [`JitterScheduler`],
//! [`SessionWorker`]) and the [`Orchestrator`] that runs one worker per
//! account.

mod backoff;
mod clock;
mod error;
mod jitter;
mod machine;
mod orchestrator;
mod state;
mod worker;

#[cfg(test)]
mod testing;

pub use backoff::Backoff;
pub use clock::{Clock, SystemClock, TokioClock, next_daily_boundary};
pub use error::SessionError;
pub use jitter::{JitterScheduler, ScheduleDecision};
pub use machine::ActionStateMachine;
pub use orchestrator::{Orchestrator, SessionEvent};
pub use state::{ActionEntry, ActionStatus, SessionRuntimeState};
pub use worker::{SessionView, SessionWorker, WorkerContext, WorkerExit, WorkerPhase, WorkerReport};
