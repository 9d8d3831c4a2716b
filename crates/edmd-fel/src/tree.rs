//! Binary-tree FEL: every particle with a finite PEL top is a leaf of one
//! [`Cbt`] tournament.

use edmd_core::ParticleId;
use edmd_event::{Event, PendingEventList};

use crate::arena::PelArena;
use crate::cbt::Cbt;
use crate::{FelResult, FelStats, FutureEventList};

/// O(log N) future event list.  Always returns the exact global minimum.
#[derive(Debug, Default)]
pub struct TreeFel<P> {
    arena:   PelArena<P>,
    cbt:     Cbt,
    /// Particle whose PEL changed since its tree position was last fixed.
    active:  Option<usize>,
    streams: usize,
}

impl<P: PendingEventList> TreeFel<P> {
    pub fn new(slots: usize) -> Self {
        let mut fel = Self {
            arena:   PelArena::default(),
            cbt:     Cbt::default(),
            active:  None,
            streams: 0,
        };
        fel.init(slots);
        fel
    }

    /// Fix the tree position of the previously active particle unless it is
    /// `next`, then make `next` active.
    fn flush(&mut self, next: Option<usize>) {
        if let Some(a) = self.active {
            if Some(a) != next {
                self.reposition(a);
            }
        }
        self.active = next;
    }

    fn reposition(&mut self, i: usize) {
        let arena = &self.arena;
        let later = |a: usize, b: usize| arena.later(a, b);
        match (arena.pels[i].is_never(), self.cbt.contains(i)) {
            (true, true) => self.cbt.delete(i, &later),
            (true, false) => {}
            (false, true) => self.cbt.update(i, &later),
            (false, false) => self.cbt.insert(i, &later),
        }
    }
}

impl<P: PendingEventList> FutureEventList for TreeFel<P> {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn init(&mut self, slots: usize) {
        self.arena.init(slots);
        self.cbt.resize(slots);
        self.active = None;
        self.streams = 0;
        self.arena.stats.lists = 1;
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.cbt.clear();
        self.active = None;
    }

    fn slots(&self) -> usize {
        self.arena.pels.len()
    }

    fn push(&mut self, event: Event) -> FelResult<()> {
        let i = self.arena.check(&event)?;
        self.flush(Some(i));
        self.arena.push(i, event);
        Ok(())
    }

    fn top(&mut self) -> Option<Event> {
        loop {
            self.flush(None);
            let i = self.cbt.top()?;
            let top = self.arena.top_of(i);
            if self.arena.is_stale(&top) {
                self.active = Some(i);
                self.arena.pels[i].pop();
                self.arena.stats.stale_discards += 1;
                continue;
            }
            return Some(self.arena.present(top));
        }
    }

    fn pop(&mut self) {
        if self.top().is_none() {
            return;
        }
        if let Some(i) = self.cbt.top() {
            self.active = Some(i);
            self.arena.pels[i].pop();
        }
    }

    fn invalidate(&mut self, id: ParticleId) {
        let i = id.index();
        if i < self.arena.pels.len() {
            self.flush(Some(i));
            self.arena.invalidate(i);
        }
    }

    fn stream(&mut self, dt: f64) {
        self.arena.pec_time += dt;
        self.streams += 1;
        if self.streams >= self.arena.pels.len().max(1) {
            self.arena.fold_pec_time();
            self.streams = 0;
        }
    }

    fn rescale_times(&mut self, factor: f64) -> FelResult<()> {
        self.arena.rescale(factor)
    }

    fn stats(&self) -> FelStats {
        self.arena.stats.clone()
    }
}
