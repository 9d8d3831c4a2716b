//! Event sources: the collaborators that know the physics.

use edmd_core::ParticleId;
use edmd_event::Event;

use crate::SourceResult;

/// A producer and consumer of one family of events (an interaction law, a
/// wall, a thermostat, …).
///
/// Every method has a default except [`dispatch`](Self::dispatch), so a
/// source only implements the predictions it makes.  Predictions are
/// relative to the current system time and return
/// [`Event::never`] when nothing will happen.
///
/// The scheduler stamps `source` and `primary` on every prediction it
/// queues, so a source does not need to know its own registration index.
/// A prediction error is logged and treated as "never".
///
/// # Example: a wall at `x = 0`
///
/// ```rust,ignore
/// impl EventSource<Gas> for Wall {
///     fn name(&self) -> &str { "wall" }
///
///     fn predict(&self, world: &Gas, id: ParticleId) -> SourceResult<Event> {
///         Ok(match world.time_to_plane(id, 0.0) {
///             Some(dt) => Event::single(EventKind::Local, dt, id, SourceId::INVALID),
///             None => Event::never(id),
///         })
///     }
///
///     fn dispatch(&mut self, world: &mut Gas, event: &Event) -> SourceResult<Vec<ParticleId>> {
///         world.reflect_x(event.primary);
///         Ok(vec![event.primary])
///     }
/// }
/// ```
pub trait EventSource<W>: Send {
    fn name(&self) -> &str;

    /// Next single-particle event for `id`.
    fn predict(&self, _world: &W, id: ParticleId) -> SourceResult<Event> {
        Ok(Event::never(id))
    }

    /// Next interaction between `id` and the neighbour `other`.
    fn predict_pair(&self, _world: &W, id: ParticleId, _other: ParticleId) -> SourceResult<Event> {
        Ok(Event::never(id))
    }

    /// Next system-wide event.
    fn predict_system(&self, _world: &W) -> SourceResult<Event> {
        Ok(Event::never(ParticleId::INVALID))
    }

    /// Apply `event` to the world.  The world has already been advanced to
    /// the event time.  Returns every particle whose predictions the event
    /// may have changed, beyond the event's own participants.
    fn dispatch(&mut self, world: &mut W, event: &Event) -> SourceResult<Vec<ParticleId>>;

    /// The world was rebuilt or replaced; drop any cached state.
    fn reinitialise(&mut self, _world: &W) {}
}
