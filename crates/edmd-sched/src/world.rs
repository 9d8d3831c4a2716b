//! The simulated world as seen by the scheduler.

use edmd_cells::Boundary;
use edmd_core::ParticleId;

/// Earliest face of a cell that a particle will cross.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoxExit {
    /// Time until the crossing, relative to now.
    pub dt:       f64,
    /// Axis normal to the crossed face.
    pub dim:      usize,
    /// `true` for the upper face.
    pub positive: bool,
}

/// Particle state owned by the application.
///
/// The scheduler never interprets particle state itself.  It asks the world
/// for positions (to bin particles into cells), for cell-exit times, and to
/// advance time.  Everything else goes through
/// [`EventSource`](crate::EventSource)s.
///
/// `position` must report the state at the current system time.  A world is
/// free to update particles lazily as long as that holds.
pub trait World<const D: usize>: Boundary<D> + Send {
    /// Number of particles, with ids `0..entity_count()`.
    fn entity_count(&self) -> usize;

    fn position(&self, id: ParticleId) -> [f64; D];

    /// Advance the world clock by `dt`.
    fn stream(&mut self, dt: f64);

    /// When `id` leaves the box `lower..upper`, or `None` if it never does.
    fn box_exit(&self, id: ParticleId, lower: &[f64; D], upper: &[f64; D]) -> Option<BoxExit>;

    /// `id` has just moved to another cell.  Worlds with sliding boundaries
    /// may fold it back into the primary image here.
    fn cell_changed(&mut self, _id: ParticleId) {}

    /// All event times are being multiplied by `factor`.
    fn rescale_times(&mut self, _factor: f64) {}
}
