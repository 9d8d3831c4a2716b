//! The `Event` value type.
//!
//! # Time model
//!
//! `dt` is always relative to the owning FEL's notion of "now".  It is never
//! an absolute time.  An event that will not happen has `dt == NEVER`
//! (positive infinity); such events are dropped on push and never compete
//! for the global minimum.
//!
//! # Ordering
//!
//! Events are ordered by `dt` first (IEEE total order), then by
//! `(kind, primary, secondary)`.  The secondary key makes dispatch order
//! deterministic when two events fall on exactly the same time.  `source`,
//! `aux` and `generation` do not take part in the ordering.

use std::cmp::Ordering;
use std::fmt;

use edmd_core::{ParticleId, SourceId};

/// Sentinel time for "this will never happen".
pub const NEVER: f64 = f64::INFINITY;

// ── EventKind ─────────────────────────────────────────────────────────────────

/// Classification of an event.  Declaration order is the tie-break order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// Two-particle event (collision, well capture, …).
    Interaction,
    /// The primary particle leaves its current cell.
    CellTransition,
    /// The primary particle meets a local feature (wall, boundary, …).
    Local,
    /// System-wide event (thermostat, snapshot, …).
    System,
    /// The primary's predictions are stale or exhausted and must be
    /// regenerated before anything else is trusted.
    Recalculate,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interaction => "interaction",
            Self::CellTransition => "cell-transition",
            Self::Local => "local",
            Self::System => "system",
            Self::Recalculate => "recalculate",
        })
    }
}

// ── Event ─────────────────────────────────────────────────────────────────────

/// A predicted future occurrence for one or two particles.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Time until the event, relative to "now".
    pub dt:        f64,
    pub kind:      EventKind,
    pub primary:   ParticleId,
    /// Partner particle of an interaction, absent for single-particle events.
    pub secondary: Option<ParticleId>,
    /// Which registered event source produced this event.
    pub source:    SourceId,
    /// Source-specific payload (feature index, crossing direction, …).
    pub aux:       u32,
    /// Generation of `secondary` when the event was queued.  Maintained by
    /// the FEL; an out-of-date generation marks the event as stale.
    pub generation: u32,
}

impl Event {
    /// An event that never happens.
    pub const fn never(primary: ParticleId) -> Self {
        Self {
            dt: NEVER,
            kind: EventKind::Local,
            primary,
            secondary: None,
            source: SourceId::INVALID,
            aux: 0,
            generation: 0,
        }
    }

    /// Single-particle event (local, cell-transition or system).
    pub fn single(kind: EventKind, dt: f64, primary: ParticleId, source: SourceId) -> Self {
        Self { dt, kind, primary, source, ..Self::never(primary) }
    }

    /// Two-particle interaction event.
    pub fn interaction(
        dt: f64,
        primary: ParticleId,
        secondary: ParticleId,
        source: SourceId,
    ) -> Self {
        Self {
            dt,
            kind: EventKind::Interaction,
            primary,
            secondary: Some(secondary),
            source,
            ..Self::never(primary)
        }
    }

    /// Recalculation sentinel for `primary` at time `dt`.
    pub fn recalculate(dt: f64, primary: ParticleId) -> Self {
        Self { dt, kind: EventKind::Recalculate, ..Self::never(primary) }
    }

    pub fn with_aux(mut self, aux: u32) -> Self {
        self.aux = aux;
        self
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = source;
        self
    }

    #[inline]
    pub fn is_never(&self) -> bool {
        self.dt == NEVER
    }

    #[inline]
    pub fn is_recalculate(&self) -> bool {
        self.kind == EventKind::Recalculate
    }

    /// `true` if `id` is the primary or the secondary of this event.
    #[inline]
    pub fn involves(&self, id: ParticleId) -> bool {
        self.primary == id || self.secondary == Some(id)
    }

    /// Dispatch priority: earlier events compare `Less`.
    #[inline]
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        self.dt
            .total_cmp(&other.dt)
            .then(self.kind.cmp(&other.kind))
            .then(self.primary.cmp(&other.primary))
            .then(self.secondary.cmp(&other.secondary))
    }

    /// `true` if `self` must be dispatched strictly before `other`.
    #[inline]
    pub fn precedes(&self, other: &Self) -> bool {
        self.cmp_priority(other) == Ordering::Less
    }

    /// Identity of the prediction this event represents within its PEL.
    #[inline]
    pub fn prediction_key(&self) -> PredictionKey {
        PredictionKey {
            kind:       self.kind,
            secondary:  self.secondary,
            source:     self.source,
            generation: self.generation,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} dt={}", self.kind, self.primary, self.dt)?;
        if let Some(s) = self.secondary {
            write!(f, " with {s}")?;
        }
        Ok(())
    }
}

// ── PredictionKey ─────────────────────────────────────────────────────────────

/// Two events with the same key in one PEL are the same prediction; only
/// the earlier is kept.
///
/// The source is part of the key so that two walls may both predict a
/// local event for the same particle.  The generation is part of the key
/// so that a fresh prediction is never shadowed by a stale one.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PredictionKey {
    pub kind:       EventKind,
    pub secondary:  Option<ParticleId>,
    pub source:     SourceId,
    pub generation: u32,
}
