//! Order-independent particle pair keys.
//!
//! Sparse per-pair state ("these two are bonded", "this pair has collided
//! n times") is kept in hash maps keyed by [`PairKey`] rather than dense
//! N×N matrices.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ParticleId;

/// Canonical `(min, max)` pair of particle ids.
///
/// `PairKey::new(a, b) == PairKey::new(b, a)` for all `a`, `b`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairKey {
    lo: ParticleId,
    hi: ParticleId,
}

impl PairKey {
    #[inline]
    pub fn new(a: ParticleId, b: ParticleId) -> Self {
        if a <= b { Self { lo: a, hi: b } } else { Self { lo: b, hi: a } }
    }

    #[inline]
    pub fn lo(self) -> ParticleId {
        self.lo
    }

    #[inline]
    pub fn hi(self) -> ParticleId {
        self.hi
    }

    /// The member of the pair that is not `id`, or `None` if `id` is not in it.
    pub fn other(self, id: ParticleId) -> Option<ParticleId> {
        if id == self.lo {
            Some(self.hi)
        } else if id == self.hi {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Both ids packed into one `u64` (`lo` in the high half).
    #[inline]
    pub fn packed(self) -> u64 {
        ((self.lo.0 as u64) << 32) | self.hi.0 as u64
    }
}

/// Sparse map of per-pair state.
pub type PairMap<V> = FxHashMap<PairKey, V>;

/// Sparse set of pairs (e.g. currently captured pairs).
pub type PairSet = FxHashSet<PairKey>;
