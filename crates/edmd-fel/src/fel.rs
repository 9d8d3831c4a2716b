//! The `FutureEventList` trait and its statistics.

use edmd_core::ParticleId;
use edmd_event::Event;

use crate::FelResult;

/// Global event queue over one PEL per particle.
///
/// Event times going in and coming out are relative to the list's "now".
/// `stream(dt)` moves "now" forward; nothing else changes it.
pub trait FutureEventList: Send {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Drop everything and size the list for `slots` particles
    /// (ids `0..slots`).
    fn init(&mut self, slots: usize);

    /// Empty every PEL, keeping the size.
    fn clear(&mut self);

    /// Number of particle slots.
    fn slots(&self) -> usize;

    /// Queue `event` in the PEL of `event.primary`.
    fn push(&mut self, event: Event) -> FelResult<()>;

    /// The earliest live event, or `None` if nothing will ever happen.
    ///
    /// May return a [`Recalculate`](edmd_event::EventKind::Recalculate)
    /// sentinel whose `primary` names the particle to regenerate.
    fn top(&mut self) -> Option<Event>;

    /// Remove the event `top()` would return.
    fn pop(&mut self);

    /// Forget every prediction for `id` and every queued event that names
    /// `id` as its secondary.
    fn invalidate(&mut self, id: ParticleId);

    /// Advance "now" by `dt`.
    fn stream(&mut self, dt: f64);

    /// Multiply every queued time by `factor`.
    fn rescale_times(&mut self, factor: f64) -> FelResult<()>;

    /// Re-tune internal parameters from the current event times.
    fn optimise(&mut self) {}

    fn stats(&self) -> FelStats;

    fn is_empty(&mut self) -> bool {
        self.top().is_none()
    }
}

/// Counters and tuning state reported by a FEL.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FelStats {
    pub pushes:          u64,
    /// Events dropped because their secondary had been invalidated.
    pub stale_discards:  u64,
    /// Calendar entries that landed beyond one full cycle.
    pub overflow_events: u64,
    pub optimisations:   u64,
    /// Optimisations that fell back to a single list.
    pub fallbacks:       u64,
    /// Current calendar bucket count (1 for the tree).
    pub lists:           usize,
    /// Current calendar buckets per unit time (0 for the tree).
    pub scale:           f64,
}
