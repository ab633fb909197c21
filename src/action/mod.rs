//! Action vocabulary shared by the scheduler and the remote client.
//!
//! Defines what can be done for a session ([`ActionKind`]), what comes back
//! from doing it ([`Outcome`]), and the narrow seams through which the
//! scheduler reaches the network ([`ActionClient`], [`SessionConnector`]).

mod client;
mod kind;
mod outcome;

pub use client::{ActionClient, ActionParams, AuthError, GamePlan, SessionConnector, StateSnapshot};
pub use kind::{ActionKind, Dependency};
pub use outcome::{ActionPayload, ErrorClass, Outcome};
