//! Scheduler statistics and resumable checkpoints.

use edmd_core::SchedulerConfig;

/// Counters maintained by the scheduler over its lifetime.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerStats {
    /// Dispatched events of every kind.
    pub events:              u64,
    pub interactions:        u64,
    pub local_events:        u64,
    pub cell_transitions:    u64,
    pub system_events:       u64,
    pub recalculations:      u64,
    /// Events dropped because their re-prediction no longer held.
    pub rejections:          u64,
    /// Events found in the past beyond the tolerance, plus cell
    /// membership faults.
    pub anomalies:           u64,
    /// Slightly negative times rounded up to zero.
    pub clamped:             u64,
    /// Predictions that failed and were treated as "never".
    pub prediction_failures: u64,
}

/// How a [`Scheduler::run`](crate::Scheduler::run) ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The event target was reached.
    Completed,
    /// The halt flag was raised between two events.
    Halted,
}

/// Everything the scheduler needs to resume a run against a world that
/// was saved alongside it.
///
/// Predictions are not stored: they are regenerated from the world on
/// [`Scheduler::restore`](crate::Scheduler::restore).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint {
    pub system_time:  f64,
    pub entity_count: usize,
    pub stats:        SchedulerStats,
    pub config:       SchedulerConfig,
}
