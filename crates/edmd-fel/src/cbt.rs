//! Complete binary tree tournament over particle ids.
//!
//! Layout (1-based, heap-style):
//!
//! ```text
//!   tree[1]                    overall winner
//!   tree[f]                    winner of children 2f and 2f+1
//!   tree[np .. 2np]            leaves, one per participating id
//!   leaf[id]                   position of `id`'s leaf, NONE if absent
//! ```
//!
//! Internal nodes store the *id* of the winning leaf, not its key, so the
//! tree never copies events.  Keys are compared through the `later`
//! closure, which reports whether id `a` is dispatched strictly after `b`.
//! Leaves are added and removed in pairs at the end of the array, which
//! keeps the tree complete and every path O(log N).

/// "No id" / "not in the tree".
pub const NONE: usize = usize::MAX;

#[derive(Clone, Debug, Default)]
pub struct Cbt {
    tree: Vec<usize>,
    leaf: Vec<usize>,
    np:   usize,
}

impl Cbt {
    pub fn with_slots(slots: usize) -> Self {
        let mut cbt = Self::default();
        cbt.resize(slots);
        cbt
    }

    /// Size for ids `0..slots` and empty the tree.
    pub fn resize(&mut self, slots: usize) {
        self.tree = vec![NONE; 2 * slots.max(1)];
        self.leaf = vec![NONE; slots];
        self.np = 0;
    }

    pub fn clear(&mut self) {
        self.tree.fill(NONE);
        self.leaf.fill(NONE);
        self.np = 0;
    }

    /// Number of participating ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.np
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.np == 0
    }

    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        self.leaf[id] != NONE
    }

    /// Current winner.
    #[inline]
    pub fn top(&self) -> Option<usize> {
        (self.np > 0).then(|| self.tree[1])
    }

    /// Add `id`.  The last leaf is split into a parent holding its old id
    /// and two children: the old id and `id`.
    pub fn insert(&mut self, id: usize, later: &impl Fn(usize, usize) -> bool) {
        debug_assert!(!self.contains(id), "id {id} inserted twice");
        if self.np == 0 {
            self.tree[1] = id;
            self.leaf[id] = 1;
            self.np = 1;
            return;
        }
        let np = self.np;
        let j = self.tree[np];
        self.tree[2 * np] = j;
        self.tree[2 * np + 1] = id;
        self.leaf[j] = 2 * np;
        self.leaf[id] = 2 * np + 1;
        self.np += 1;
        self.update(j, later);
    }

    /// Remove `id`.  The last leaf pair collapses into its parent and the
    /// freed leaf, if it was not `id`, moves into `id`'s slot.
    pub fn delete(&mut self, id: usize, later: &impl Fn(usize, usize) -> bool) {
        debug_assert!(self.contains(id), "id {id} deleted but not in the tree");
        if self.np < 2 {
            self.tree[1] = NONE;
            self.leaf[id] = NONE;
            self.np = 0;
            return;
        }
        let l = 2 * self.np - 1;
        let (left, right) = (self.tree[l - 1], self.tree[l]);
        if left == id {
            self.leaf[right] = l / 2;
            self.tree[l / 2] = right;
            self.update(right, later);
        } else {
            self.leaf[left] = l / 2;
            self.tree[l / 2] = left;
            self.update(left, later);
            if right != id {
                let slot = self.leaf[id];
                self.tree[slot] = right;
                self.leaf[right] = slot;
                self.update(right, later);
            }
        }
        self.np -= 1;
        self.leaf[id] = NONE;
    }

    /// Re-run the tournament on the path from `id`'s leaf after its key
    /// changed.
    pub fn update(&mut self, id: usize, later: &impl Fn(usize, usize) -> bool) {
        let mut f = self.leaf[id] / 2;
        // Nodes that `id` currently wins must be replayed regardless.
        while f > 0 && self.tree[f] == id {
            self.tree[f] = self.winner(f, later);
            f /= 2;
        }
        // Above that, stop as soon as a winner survives.
        while f > 0 {
            let previous = self.tree[f];
            self.tree[f] = self.winner(f, later);
            if self.tree[f] == previous {
                return;
            }
            f /= 2;
        }
    }

    #[inline]
    fn winner(&self, f: usize, later: &impl Fn(usize, usize) -> bool) -> usize {
        let (l, r) = (self.tree[2 * f], self.tree[2 * f + 1]);
        if later(r, l) { l } else { r }
    }
}
