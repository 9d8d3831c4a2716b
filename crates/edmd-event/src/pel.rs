//! Per-particle pending-event lists (PELs).
//!
//! A PEL caches a particle's candidate events.  The FEL only ever reads its
//! `top()`, so the contract is small:
//!
//! - `top()` is O(1) and returns the earliest event, or a
//!   [`EventKind::Recalculate`](crate::EventKind::Recalculate) sentinel.  The sentinel carries time
//!   [`NEVER`] when the PEL is simply empty, and a finite time when a
//!   bounded PEL had to throw events away and the particle must be
//!   re-predicted before that time.
//! - at most one event per [`PredictionKey`]; a repeated prediction keeps
//!   the earlier of the two.
//! - events with `dt == NEVER` are dropped on push.
//!
//! The sentinel returned by `top()` has `primary == ParticleId::INVALID`;
//! a PEL does not know which particle owns it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use edmd_core::ParticleId;
use rustc_hash::FxHashSet;

use crate::{Event, MinMaxHeap, NEVER, PredictionKey};

/// Interface shared by every PEL strategy.
pub trait PendingEventList: Clone + Default + fmt::Debug + Send + 'static {
    /// Maximum number of events held, `None` when unbounded.
    const CAPACITY: Option<usize>;

    fn push(&mut self, event: Event);

    /// Earliest event or the recalculation sentinel.
    fn top(&self) -> Event;

    /// Remove the earliest event.  Popping the recalculation sentinel
    /// empties the list.
    fn pop(&mut self);

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nothing in this list will ever happen.
    fn is_never(&self) -> bool {
        self.top().is_never()
    }

    /// Move the time origin forward by `dt` (subtract `dt` from every time).
    fn stream(&mut self, dt: f64);

    /// Multiply every stored time by `factor` (must be positive).
    fn rescale_times(&mut self, factor: f64);
}

// ── MinMaxPel ─────────────────────────────────────────────────────────────────

/// Bounded PEL over a [`MinMaxHeap`].  The right choice for small N.
///
/// When full, a new event displaces the latest one.  The earliest time ever
/// thrown away is remembered; once that time is reached `top()` reports a
/// recalculation sentinel instead of a real event.
#[derive(Clone, Debug)]
pub struct MinMaxPel<const N: usize> {
    heap:   MinMaxHeap<N>,
    recalc: f64,
}

impl<const N: usize> Default for MinMaxPel<N> {
    fn default() -> Self {
        Self {
            heap:   MinMaxHeap::new(),
            recalc: NEVER,
        }
    }
}

impl<const N: usize> MinMaxPel<N> {
    /// Earliest time discarded since the last clear.
    pub fn recalc_time(&self) -> f64 {
        self.recalc
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.heap.iter()
    }

    fn sentinel_on_top(&self) -> bool {
        match self.heap.min() {
            None => true,
            Some(min) => self.recalc < min.dt,
        }
    }

    fn remove_prediction(&mut self, key: PredictionKey) {
        let old = self.heap.clone();
        self.heap.clear();
        for e in old.iter().filter(|e| e.prediction_key() != key) {
            let _ = self.heap.push(*e);
        }
    }
}

impl<const N: usize> PendingEventList for MinMaxPel<N> {
    const CAPACITY: Option<usize> = Some(N);

    fn push(&mut self, event: Event) {
        if event.is_never() {
            return;
        }
        let key = event.prediction_key();
        if let Some(existing) = self.heap.iter().find(|e| e.prediction_key() == key) {
            if !event.precedes(existing) {
                return;
            }
            self.remove_prediction(key);
        }
        if let Err(event) = self.heap.push(event) {
            match self.heap.max() {
                Some(worst) if event.precedes(worst) => {
                    if let Some(evicted) = self.heap.replace_max(event) {
                        self.recalc = self.recalc.min(evicted.dt);
                    }
                }
                _ => self.recalc = self.recalc.min(event.dt),
            }
        }
    }

    fn top(&self) -> Event {
        if self.sentinel_on_top() {
            return Event::recalculate(self.recalc, ParticleId::INVALID);
        }
        *self.heap.min().unwrap_or(&Event::never(ParticleId::INVALID))
    }

    fn pop(&mut self) {
        if self.sentinel_on_top() {
            self.clear();
        } else {
            self.heap.pop_min();
        }
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.recalc = NEVER;
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn stream(&mut self, dt: f64) {
        for e in self.heap.iter_mut() {
            e.dt -= dt;
        }
        self.recalc -= dt;
    }

    fn rescale_times(&mut self, factor: f64) {
        debug_assert!(factor > 0.0, "rescale factor must be positive, got {factor}");
        for e in self.heap.iter_mut() {
            e.dt *= factor;
        }
        self.recalc *= factor;
    }
}

// ── HeapPel ───────────────────────────────────────────────────────────────────

/// Heap entry ordered so that `BinaryHeap` (a max-heap) pops the earliest.
#[derive(Clone, Debug)]
struct Queued(Event);

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp_priority(&self.0)
    }
}

/// Unbounded PEL over a binary heap, for sources that predict many
/// candidates per particle.  Never evicts, so never asks for recalculation.
#[derive(Clone, Debug, Default)]
pub struct HeapPel {
    heap: BinaryHeap<Queued>,
    keys: FxHashSet<PredictionKey>,
}

impl HeapPel {
    fn map_times(&mut self, f: impl Fn(f64) -> f64) {
        // Uniform order-preserving edit; re-heapify is O(k).
        let mut items = std::mem::take(&mut self.heap).into_vec();
        for q in &mut items {
            q.0.dt = f(q.0.dt);
        }
        self.heap = BinaryHeap::from(items);
    }
}

impl PendingEventList for HeapPel {
    const CAPACITY: Option<usize> = None;

    fn push(&mut self, event: Event) {
        if event.is_never() {
            return;
        }
        let key = event.prediction_key();
        if !self.keys.insert(key) {
            if let Some(existing) = self.heap.iter().find(|q| q.0.prediction_key() == key) {
                if !event.precedes(&existing.0) {
                    return;
                }
                self.heap.retain(|q| q.0.prediction_key() != key);
            }
        }
        self.heap.push(Queued(event));
    }

    fn top(&self) -> Event {
        self.heap
            .peek()
            .map(|q| q.0)
            .unwrap_or_else(|| Event::recalculate(NEVER, ParticleId::INVALID))
    }

    fn pop(&mut self) {
        if let Some(q) = self.heap.pop() {
            self.keys.remove(&q.0.prediction_key());
        }
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.keys.clear();
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn stream(&mut self, dt: f64) {
        self.map_times(|t| t - dt);
    }

    fn rescale_times(&mut self, factor: f64) {
        debug_assert!(factor > 0.0, "rescale factor must be positive, got {factor}");
        self.map_times(|t| t * factor);
    }
}
