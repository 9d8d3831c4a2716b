//! Linear-scan FEL.  O(N) per query; exists to check the fast strategies
//! against and to debug suspected ordering bugs.

use edmd_core::ParticleId;
use edmd_event::{Event, PendingEventList};

use crate::arena::PelArena;
use crate::{FelResult, FelStats, FutureEventList};

#[derive(Debug, Default)]
pub struct ScanFel<P> {
    arena: PelArena<P>,
}

impl<P: PendingEventList> ScanFel<P> {
    pub fn new(slots: usize) -> Self {
        let mut fel = Self { arena: PelArena::default() };
        fel.init(slots);
        fel
    }

    fn earliest(&self) -> Option<usize> {
        let mut best: Option<(usize, Event)> = None;
        for i in 0..self.arena.pels.len() {
            let top = self.arena.top_of(i);
            if top.is_never() {
                continue;
            }
            if best.as_ref().is_none_or(|(_, b)| top.precedes(b)) {
                best = Some((i, top));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl<P: PendingEventList> FutureEventList for ScanFel<P> {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn init(&mut self, slots: usize) {
        self.arena.init(slots);
        self.arena.stats.lists = 1;
    }

    fn clear(&mut self) {
        self.arena.clear();
    }

    fn slots(&self) -> usize {
        self.arena.pels.len()
    }

    fn push(&mut self, event: Event) -> FelResult<()> {
        let i = self.arena.check(&event)?;
        self.arena.push(i, event);
        Ok(())
    }

    fn top(&mut self) -> Option<Event> {
        loop {
            let i = self.earliest()?;
            let top = self.arena.top_of(i);
            if self.arena.is_stale(&top) {
                self.arena.pels[i].pop();
                self.arena.stats.stale_discards += 1;
                continue;
            }
            return Some(self.arena.present(top));
        }
    }

    fn pop(&mut self) {
        if self.top().is_some() {
            if let Some(i) = self.earliest() {
                self.arena.pels[i].pop();
            }
        }
    }

    fn invalidate(&mut self, id: ParticleId) {
        if id.index() < self.arena.pels.len() {
            self.arena.invalidate(id.index());
        }
    }

    fn stream(&mut self, dt: f64) {
        self.arena.pec_time += dt;
    }

    fn rescale_times(&mut self, factor: f64) -> FelResult<()> {
        self.arena.rescale(factor)
    }

    fn stats(&self) -> FelStats {
        self.arena.stats.clone()
    }
}
