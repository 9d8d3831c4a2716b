//! Scheduler observer trait for progress reporting and data collection.

use edmd_core::ParticleId;
use edmd_event::Event;

use crate::SchedulerStats;

/// Callbacks invoked by [`Scheduler::step`](crate::Scheduler::step) and
/// [`Scheduler::run`](crate::Scheduler::run).
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct Progress { every: u64, seen: u64 }
///
/// impl SchedulerObserver for Progress {
///     fn on_event(&mut self, _event: &Event, system_time: f64) {
///         self.seen += 1;
///         if self.seen % self.every == 0 {
///             println!("{} events, t = {system_time}", self.seen);
///         }
///     }
/// }
/// ```
pub trait SchedulerObserver {
    /// Called after an event has been dispatched and every affected
    /// particle has been re-predicted.  `system_time` is the event time.
    fn on_event(&mut self, _event: &Event, _system_time: f64) {}

    /// Called after a particle's predictions were regenerated in response
    /// to a recalculation marker.
    fn on_recalculate(&mut self, _id: ParticleId) {}

    /// Called when an event failed revalidation and was not dispatched.
    fn on_rejection(&mut self, _event: &Event) {}

    /// Called when a run stops early because it was halted.
    fn on_halt(&mut self, _stats: &SchedulerStats) {}

    /// Called once when a run reaches its event target.
    fn on_run_end(&mut self, _stats: &SchedulerStats) {}
}

/// A [`SchedulerObserver`] that does nothing.
pub struct NoopObserver;

impl SchedulerObserver for NoopObserver {}
