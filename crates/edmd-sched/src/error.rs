//! Scheduler error types.

use thiserror::Error;

use edmd_cells::CellError;
use edmd_core::{CoreError, ParticleId, SourceId};
use edmd_event::Event;
use edmd_fel::FelError;

/// Errors produced by [`Scheduler`](crate::Scheduler).
#[derive(Debug, Error)]
pub enum SchedError {
    #[error("scheduler configuration error: {0}")]
    Config(String),

    #[error("{what} has {got} entities but the world has {expected}")]
    EntityCountMismatch {
        expected: usize,
        got:      usize,
        what:     &'static str,
    },

    #[error(
        "event time is NaN for {event} at system time {system_time} after {events} events"
    )]
    NotANumber {
        event:       Event,
        system_time: f64,
        events:      u64,
    },

    #[error("{event} is in the past (beyond tolerance {tolerance}) at system time {system_time}")]
    Causality {
        event:       Event,
        system_time: f64,
        tolerance:   f64,
    },

    #[error("out of events at system time {system_time} after {events} events")]
    OutOfEvents { system_time: f64, events: u64 },

    #[error("no event source registered as {0}")]
    UnknownSource(SourceId),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cells(#[from] CellError),

    #[error(transparent)]
    Fel(#[from] FelError),
}

pub type SchedResult<T> = Result<T, SchedError>;

/// Failure reported by an [`EventSource`](crate::EventSource).
///
/// Prediction failures are not fatal: the prediction is treated as "never".
/// Dispatch failures abort the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot predict for {id}: {reason}")]
    Prediction { id: ParticleId, reason: String },

    #[error("cannot dispatch {event}: {reason}")]
    Dispatch { event: Event, reason: String },
}

pub type SourceResult<T> = Result<T, SourceError>;
