//! Calendar-queue FEL.
//!
//! # Structure
//!
//! ```text
//!   lists[0 .. nlists]   one unordered, doubly linked bucket per time window
//!   lists[nlists]        overflow: beyond one full cycle
//!   lists[current]       always empty; its members live in the tree instead
//!   cbt                  tournament over the members of the current bucket
//! ```
//!
//! A particle with stored top time `t` belongs to bucket `floor(scale * t)`,
//! clamped so it is never earlier than `current`.  Only the current bucket
//! is kept sorted; every other bucket is a plain linked list, so insert and
//! delete are O(1).
//!
//! When the tree runs dry, `current` advances to the next non-empty bucket
//! and its members are promoted into the tree.  Passing the last bucket
//! wraps around: every PEL is streamed forward by one cycle width and the
//! overflow list is redistributed.
//!
//! # Tuning
//!
//! [`CalendarFel::optimise`] derives `scale` from the spread of current PEL
//! tops.  Too few samples, or no spread at all, falls back to a single
//! bucket, which is exactly the tree strategy.  The calendar starts in that
//! single-bucket state until first optimised.
//!
//! Links are integer indices into per-particle arrays, with
//! [`NONE`](crate::cbt::NONE) as the null link.

use edmd_core::{CalendarConfig, ParticleId};
use edmd_event::{Event, PendingEventList};
use tracing::debug;

use crate::arena::PelArena;
use crate::cbt::{Cbt, NONE};
use crate::{FelResult, FelStats, FutureEventList};

/// Fewer finite PEL tops than this and the statistics are not trusted.
const MIN_SAMPLES: usize = 10;

#[derive(Debug)]
pub struct CalendarFel<P> {
    arena:   PelArena<P>,
    cbt:     Cbt,
    // ── Per-particle links (SoA, indexed by particle) ──
    next:    Vec<usize>,
    prev:    Vec<usize>,
    /// Bucket holding the particle, NONE when not queued.
    bucket:  Vec<usize>,
    // ── Calendar ──
    lists:   Vec<usize>,
    current: usize,
    nlists:  usize,
    scale:   f64,
    // ── Tuning ──
    target_lists:      Option<usize>,
    optimise_interval: u64,
    pops_since_tune:   u64,
    streams:           usize,
    active:            Option<usize>,
}

impl<P: PendingEventList> CalendarFel<P> {
    pub fn new(slots: usize, config: &CalendarConfig) -> Self {
        let mut fel = Self {
            target_lists: config.initial_lists,
            optimise_interval: config.optimise_interval,
            ..Self::empty()
        };
        fel.init(slots);
        fel
    }

    fn empty() -> Self {
        Self {
            arena:             PelArena::default(),
            cbt:               Cbt::default(),
            next:              Vec::new(),
            prev:              Vec::new(),
            bucket:            Vec::new(),
            lists:             Vec::new(),
            current:           0,
            nlists:            1,
            scale:             0.0,
            target_lists:      None,
            optimise_interval: 0,
            pops_since_tune:   0,
            streams:           0,
            active:            None,
        }
    }

    /// Bucket count in use.
    pub fn lists(&self) -> usize {
        self.nlists
    }

    /// Buckets per unit time in use (0 in single-bucket mode).
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Replace the bucket layout.  Nothing is queued afterwards.
    fn reset_calendar(&mut self, nlists: usize, scale: f64) {
        let slots = self.arena.pels.len();
        self.nlists = nlists;
        self.scale = scale;
        self.current = 0;
        self.lists = vec![NONE; nlists + 1];
        self.next = vec![NONE; slots];
        self.prev = vec![NONE; slots];
        self.bucket = vec![NONE; slots];
        self.cbt.resize(slots);
        self.arena.stats.lists = nlists;
        self.arena.stats.scale = scale;
    }

    fn flush(&mut self, next: Option<usize>) {
        if let Some(a) = self.active {
            if Some(a) != next {
                self.enqueue(a);
            }
        }
        self.active = next;
    }

    /// Bucket for a stored time.
    fn slot_for(&self, dt: f64) -> usize {
        let boxed = self.scale * dt;
        let wrap_limit = 2 * self.nlists;
        let mut i = if boxed.is_nan() || boxed >= wrap_limit as f64 {
            wrap_limit
        } else if boxed <= 0.0 {
            0
        } else {
            boxed as usize
        };
        i = i.max(self.current);
        if i >= self.nlists {
            i -= self.nlists;
            if i + 1 >= self.current {
                i = self.nlists;
            }
        }
        i
    }

    /// (Re)queue particle `p` according to its current PEL top.
    fn enqueue(&mut self, p: usize) {
        self.dequeue(p);
        let top = self.arena.top_of(p);
        if top.is_never() {
            return;
        }
        let slot = self.slot_for(top.dt);
        self.bucket[p] = slot;
        if slot == self.current {
            let arena = &self.arena;
            self.cbt.insert(p, &|a: usize, b: usize| arena.later(a, b));
        } else {
            let head = self.lists[slot];
            self.next[p] = head;
            self.prev[p] = NONE;
            if head != NONE {
                self.prev[head] = p;
            }
            self.lists[slot] = p;
            if slot == self.nlists {
                self.arena.stats.overflow_events += 1;
            }
        }
    }

    fn dequeue(&mut self, p: usize) {
        let b = self.bucket[p];
        if b == NONE {
            return;
        }
        if self.cbt.contains(p) {
            let arena = &self.arena;
            self.cbt.delete(p, &|a: usize, b: usize| arena.later(a, b));
        } else {
            let (prev, next) = (self.prev[p], self.next[p]);
            if prev != NONE {
                self.next[prev] = next;
            } else {
                self.lists[b] = next;
            }
            if next != NONE {
                self.prev[next] = prev;
            }
        }
        self.bucket[p] = NONE;
        self.next[p] = NONE;
        self.prev[p] = NONE;
    }

    /// Advance `current` until the tree holds something or nothing is left.
    fn order_next(&mut self) {
        while self.cbt.is_empty() {
            self.current += 1;
            if self.current >= self.nlists {
                self.current = 0;
                let pending = self.arena.pels.iter().any(|p| !p.is_never());
                if !pending || self.scale <= 0.0 {
                    return;
                }
                let width = self.nlists as f64 / self.scale;
                for pel in &mut self.arena.pels {
                    pel.stream(width);
                }
                self.arena.pec_time -= width;
                if self.redistribute_overflow() {
                    self.retune();
                    continue;
                }
            }
            let mut e = std::mem::replace(&mut self.lists[self.current], NONE);
            let arena = &self.arena;
            let later = |a: usize, b: usize| arena.later(a, b);
            while e != NONE {
                let next = self.next[e];
                self.next[e] = NONE;
                self.prev[e] = NONE;
                self.cbt.insert(e, &later);
                e = next;
            }
        }
    }

    /// Re-bucket every overflowed particle after a wrap.  Returns `true`
    /// when the layout no longer fits the event times and should be retuned.
    fn redistribute_overflow(&mut self) -> bool {
        let mut e = std::mem::replace(&mut self.lists[self.nlists], NONE);
        let (mut moved, mut again) = (0usize, 0usize);
        while e != NONE {
            let next = self.next[e];
            self.bucket[e] = NONE;
            self.next[e] = NONE;
            self.prev[e] = NONE;
            self.enqueue(e);
            moved += 1;
            if self.bucket[e] == self.nlists {
                again += 1;
            }
            e = next;
        }
        let storm = 2 * moved > self.arena.pels.len();
        let stuck = moved > 0
            && again == moved
            && self.lists[..self.nlists].iter().all(|&h| h == NONE);
        storm || stuck
    }

    /// Rebuild the calendar from current PEL statistics.
    fn retune(&mut self) {
        self.arena.fold_pec_time();
        self.streams = 0;
        self.pops_since_tune = 0;

        let (mut lo, mut hi, mut samples) = (f64::INFINITY, f64::NEG_INFINITY, 0usize);
        for pel in &self.arena.pels {
            let t = pel.top().dt;
            if t.is_finite() {
                samples += 1;
                lo = lo.min(t);
                hi = hi.max(t);
            }
        }

        let slots = self.arena.pels.len();
        let spread = hi - lo;
        if samples < MIN_SAMPLES || hi < 0.0 || !(spread > 0.0) {
            debug!(samples, spread, "calendar statistics unusable, using a single list");
            self.reset_calendar(1, 0.0);
            self.arena.stats.fallbacks += 1;
        } else {
            // Re-origin the stored frame at the earliest top so bucket 0
            // starts there; pec_time keeps relative times unchanged.
            for pel in &mut self.arena.pels {
                pel.stream(lo);
            }
            self.arena.pec_time = -lo;
            let nlists = self.target_lists.unwrap_or(slots).max(1);
            let scale = samples as f64 / spread;
            debug!(samples, nlists, scale, "calendar retuned");
            self.reset_calendar(nlists, scale);
        }
        self.arena.stats.optimisations += 1;

        for p in 0..slots {
            self.enqueue(p);
        }
    }
}

impl<P: PendingEventList> FutureEventList for CalendarFel<P> {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn init(&mut self, slots: usize) {
        self.arena.init(slots);
        self.reset_calendar(1, 0.0);
        self.active = None;
        self.streams = 0;
        self.pops_since_tune = 0;
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.reset_calendar(self.nlists, self.scale);
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
            self.order_next();
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
        self.pops_since_tune += 1;
        if self.optimise_interval > 0 && self.pops_since_tune >= self.optimise_interval {
            self.optimise();
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
        // Wraps fold the offset in calendar mode; a single list never wraps.
        if self.scale <= 0.0 {
            self.streams += 1;
            if self.streams >= self.arena.pels.len().max(1) {
                self.arena.fold_pec_time();
                self.streams = 0;
            }
        }
    }

    fn rescale_times(&mut self, factor: f64) -> FelResult<()> {
        self.arena.rescale(factor)?;
        self.scale /= factor;
        self.arena.stats.scale = self.scale;
        Ok(())
    }

    fn optimise(&mut self) {
        self.flush(None);
        self.retune();
    }

    fn stats(&self) -> FelStats {
        self.arena.stats.clone()
    }
}
