//! Flat per-particle storage shared by every FEL strategy.

use std::cmp::Ordering;

use edmd_core::ParticleId;
use edmd_event::{Event, PendingEventList};

use crate::{FelError, FelResult, FelStats};

/// One PEL and one generation counter per particle, plus the peculiar-time
/// offset.  Stored times are `relative time + pec_time`.
#[derive(Debug, Default)]
pub(crate) struct PelArena<P> {
    pub pels:        Vec<P>,
    pub generations: Vec<u32>,
    pub pec_time:    f64,
    pub stats:       FelStats,
}

impl<P: PendingEventList> PelArena<P> {
    pub fn init(&mut self, slots: usize) {
        self.pels.clear();
        self.pels.resize_with(slots, P::default);
        self.generations = vec![0; slots];
        self.pec_time = 0.0;
    }

    pub fn clear(&mut self) {
        for (pel, generation) in self.pels.iter_mut().zip(&mut self.generations) {
            pel.clear();
            *generation = generation.wrapping_add(1);
        }
        self.pec_time = 0.0;
    }

    /// Validate an incoming event and return its slot index.
    pub fn check(&self, event: &Event) -> FelResult<usize> {
        if event.dt.is_nan() {
            return Err(FelError::NotANumber { event: *event });
        }
        let size = self.pels.len();
        let unknown = |id| FelError::UnknownParticle { id, size };
        if let Some(s) = event.secondary {
            if s.index() >= size {
                return Err(unknown(s));
            }
        }
        let i = event.primary.index();
        if i >= size {
            return Err(unknown(event.primary));
        }
        Ok(i)
    }

    /// Push into slot `i`, converting to the stored time frame and
    /// recording the secondary's generation.
    pub fn push(&mut self, i: usize, mut event: Event) {
        if let Some(s) = event.secondary {
            event.generation = self.generations[s.index()];
        }
        event.dt += self.pec_time;
        self.pels[i].push(event);
        self.stats.pushes += 1;
    }

    /// Top of slot `i` in the stored frame, with the sentinel's owner filled in.
    #[inline]
    pub fn top_of(&self, i: usize) -> Event {
        let mut top = self.pels[i].top();
        if top.is_recalculate() {
            top.primary = ParticleId(i as u32);
        }
        top
    }

    /// Slot `a`'s top is dispatched strictly after slot `b`'s.
    #[inline]
    pub fn later(&self, a: usize, b: usize) -> bool {
        self.top_of(a).cmp_priority(&self.top_of(b)) == Ordering::Greater
    }

    #[inline]
    pub fn is_stale(&self, event: &Event) -> bool {
        event
            .secondary
            .is_some_and(|s| self.generations[s.index()] != event.generation)
    }

    /// Convert a stored event back to "now"-relative time.
    #[inline]
    pub fn present(&self, mut event: Event) -> Event {
        event.dt -= self.pec_time;
        event
    }

    pub fn invalidate(&mut self, i: usize) {
        self.pels[i].clear();
        self.generations[i] = self.generations[i].wrapping_add(1);
    }

    /// Move the peculiar-time offset into every stored time.
    pub fn fold_pec_time(&mut self) {
        if self.pec_time != 0.0 {
            for pel in &mut self.pels {
                pel.stream(self.pec_time);
            }
            self.pec_time = 0.0;
        }
    }

    pub fn rescale(&mut self, factor: f64) -> FelResult<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(FelError::BadRescale(factor));
        }
        for pel in &mut self.pels {
            pel.rescale_times(factor);
        }
        self.pec_time *= factor;
        Ok(())
    }
}
