//! Fixed-capacity min-max heap of events.
//!
//! A min-max heap alternates "min levels" (even depth) and "max levels" (odd
//! depth).  The root is the earliest event and the later of its two children
//! is the latest, so both ends are O(1) to read and O(log N) to remove.  That
//! is exactly what a bounded PEL needs: read the earliest, evict the latest.
//!
//! Storage is an inline array; indices in this module are 1-based to keep
//! the parent/child arithmetic readable (`at(i)` maps to `data[i - 1]`).

use edmd_core::ParticleId;

use crate::Event;

#[derive(Clone, Debug)]
pub struct MinMaxHeap<const N: usize> {
    data: [Event; N],
    len:  usize,
}

impl<const N: usize> Default for MinMaxHeap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MinMaxHeap<N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self {
            data: [Event::never(ParticleId::INVALID); N],
            len:  0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.data[..self.len].iter()
    }

    /// Mutable access to every stored event.
    ///
    /// Only order-preserving edits are allowed (a common time shift, a
    /// positive common scale factor); anything else breaks the heap.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Event> {
        self.data[..self.len].iter_mut()
    }

    /// Earliest event.
    #[inline]
    pub fn min(&self) -> Option<&Event> {
        (self.len > 0).then(|| self.at(1))
    }

    /// Latest event.
    #[inline]
    pub fn max(&self) -> Option<&Event> {
        self.max_index().map(|i| self.at(i))
    }

    /// Insert `event`, handing it back if the heap is full.
    pub fn push(&mut self, event: Event) -> Result<(), Event> {
        if self.is_full() {
            return Err(event);
        }
        self.data[self.len] = event;
        self.len += 1;
        self.bubble_up(self.len);
        Ok(())
    }

    pub fn pop_min(&mut self) -> Option<Event> {
        if self.len == 0 {
            return None;
        }
        let min = self.data[0];
        self.data[0] = self.data[self.len - 1];
        self.len -= 1;
        if self.len > 0 {
            self.trickle_down(1);
        }
        Some(min)
    }

    pub fn pop_max(&mut self) -> Option<Event> {
        let i = self.max_index()?;
        let max = *self.at(i);
        self.data[i - 1] = self.data[self.len - 1];
        self.len -= 1;
        if i <= self.len {
            self.trickle_down(i);
        }
        Some(max)
    }

    /// Swap the latest event for `event` and return the evicted one.
    /// On an empty heap `event` is simply inserted and `None` returned.
    pub fn replace_max(&mut self, event: Event) -> Option<Event> {
        let evicted = self.pop_max();
        // A pop just made room, or the heap was empty.
        let _ = self.push(event);
        evicted
    }

    // ── Internals ─────────────────────────────────────────────────────────

    #[inline]
    fn at(&self, i: usize) -> &Event {
        &self.data[i - 1]
    }

    #[inline]
    fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(i - 1, j - 1);
    }

    /// `at(i)` is dispatched strictly before `at(j)`.
    #[inline]
    fn lt(&self, i: usize, j: usize) -> bool {
        self.at(i).precedes(self.at(j))
    }

    #[inline]
    fn is_min_level(i: usize) -> bool {
        (usize::BITS - 1 - i.leading_zeros()) % 2 == 0
    }

    fn max_index(&self) -> Option<usize> {
        match self.len {
            0 => None,
            1 => Some(1),
            2 => Some(2),
            _ => Some(if self.lt(2, 3) { 3 } else { 2 }),
        }
    }

    fn bubble_up(&mut self, i: usize) {
        if i == 1 {
            return;
        }
        let parent = i / 2;
        if Self::is_min_level(i) {
            if self.lt(parent, i) {
                self.swap(i, parent);
                self.bubble_up_max(parent);
            } else {
                self.bubble_up_min(i);
            }
        } else if self.lt(i, parent) {
            self.swap(i, parent);
            self.bubble_up_min(parent);
        } else {
            self.bubble_up_max(i);
        }
    }

    fn bubble_up_min(&mut self, mut i: usize) {
        while i >= 4 && self.lt(i, i / 4) {
            self.swap(i, i / 4);
            i /= 4;
        }
    }

    fn bubble_up_max(&mut self, mut i: usize) {
        while i >= 4 && self.lt(i / 4, i) {
            self.swap(i, i / 4);
            i /= 4;
        }
    }

    fn trickle_down(&mut self, i: usize) {
        if Self::is_min_level(i) {
            self.trickle_down_min(i);
        } else {
            self.trickle_down_max(i);
        }
    }

    /// Index of the earliest (or latest) child or grandchild of `i`.
    fn extreme_descendant(&self, i: usize, earliest: bool) -> Option<usize> {
        let candidates = [2 * i, 2 * i + 1, 4 * i, 4 * i + 1, 4 * i + 2, 4 * i + 3];
        let mut best: Option<usize> = None;
        for c in candidates.into_iter().filter(|&c| c <= self.len) {
            best = match best {
                None => Some(c),
                Some(b) if earliest && self.lt(c, b) => Some(c),
                Some(b) if !earliest && self.lt(b, c) => Some(c),
                keep => keep,
            };
        }
        best
    }

    fn trickle_down_min(&mut self, mut i: usize) {
        while let Some(m) = self.extreme_descendant(i, true) {
            if m >= 4 * i {
                if !self.lt(m, i) {
                    return;
                }
                self.swap(m, i);
                if self.lt(m / 2, m) {
                    self.swap(m, m / 2);
                }
                i = m;
            } else {
                if self.lt(m, i) {
                    self.swap(m, i);
                }
                return;
            }
        }
    }

    fn trickle_down_max(&mut self, mut i: usize) {
        while let Some(m) = self.extreme_descendant(i, false) {
            if m >= 4 * i {
                if !self.lt(i, m) {
                    return;
                }
                self.swap(m, i);
                if self.lt(m, m / 2) {
                    self.swap(m, m / 2);
                }
                i = m;
            } else {
                if self.lt(i, m) {
                    self.swap(m, i);
                }
                return;
            }
        }
    }
}
