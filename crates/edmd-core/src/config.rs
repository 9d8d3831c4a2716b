//! Scheduler configuration.
//!
//! # Design
//!
//! Configuration is a plain struct tree with `Default` values that run a
//! reasonable simulation out of the box.  The file format it is loaded from
//! belongs to the application; with the `serde` feature enabled every type
//! here derives `Serialize`/`Deserialize`.
//!
//! [`SchedulerConfig::validate`] runs before the event loop starts so that
//! every configuration mistake is reported up front with a diagnostic.

use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

// ── FelStrategy ───────────────────────────────────────────────────────────────

/// Global future-event-list strategy.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FelStrategy {
    /// Complete binary tree over all entities.  O(log N) per event, always.
    Tree,
    /// Calendar of time buckets with a sorted "current date" sub-queue.
    /// Amortized O(1) per event for smooth event-time distributions.
    #[default]
    Calendar,
}

impl FelStrategy {
    pub const NAMES: &'static str = "tree, cbt, calendar, bounded-pq";
}

impl FromStr for FelStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tree" | "cbt" => Ok(Self::Tree),
            "calendar" | "bounded-pq" | "boundedpq" => Ok(Self::Calendar),
            _ => Err(CoreError::UnknownStrategy {
                what:     "FEL",
                name:     s.to_owned(),
                expected: Self::NAMES,
            }),
        }
    }
}

impl fmt::Display for FelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tree => "tree",
            Self::Calendar => "calendar",
        })
    }
}

// ── PelStrategy ───────────────────────────────────────────────────────────────

/// Per-entity pending-event list strategy.
///
/// The `MinMaxN` variants are bounded min-max heaps holding at most N
/// events; evicted events force a recalculation of the entity.  `Heap` is
/// an unbounded binary heap.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PelStrategy {
    MinMax2,
    MinMax3,
    #[default]
    MinMax4,
    MinMax8,
    Heap,
}

impl PelStrategy {
    pub const NAMES: &'static str = "minmax2, minmax3, minmax4, minmax8, heap";

    /// Slot count, or `None` for the unbounded heap.
    pub fn capacity(self) -> Option<usize> {
        match self {
            Self::MinMax2 => Some(2),
            Self::MinMax3 => Some(3),
            Self::MinMax4 => Some(4),
            Self::MinMax8 => Some(8),
            Self::Heap => None,
        }
    }
}

impl FromStr for PelStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minmax2" => Ok(Self::MinMax2),
            "minmax3" => Ok(Self::MinMax3),
            "minmax4" => Ok(Self::MinMax4),
            "minmax8" => Ok(Self::MinMax8),
            "heap" => Ok(Self::Heap),
            _ => Err(CoreError::UnknownStrategy {
                what:     "PEL",
                name:     s.to_owned(),
                expected: Self::NAMES,
            }),
        }
    }
}

// ── NeighbourPolicy ───────────────────────────────────────────────────────────

/// What the scheduler does with entities that become neighbours of a
/// particle after it changes cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NeighbourPolicy {
    /// Mark every newly adjacent entity stale and regenerate it.
    #[default]
    Invalidate,
    /// Only predict the new pairs into the moved particle's PEL.
    PairOnly,
}

// ── CalendarConfig ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalendarConfig {
    /// Bucket count used whenever the event-time statistics are healthy.
    /// `None` uses one bucket per entity.
    pub initial_lists: Option<usize>,

    /// Re-derive the bucket width every N pops.  0 disables automatic
    /// re-optimisation (it still happens at build and on overflow storms).
    pub optimise_interval: u64,
}

// ── CellConfig ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellConfig {
    /// Neighbour search radius in cells.  1 = immediately adjacent cells.
    pub overlink: usize,

    /// Longest interaction distance any pair source needs.
    pub interaction_range: f64,

    /// Lees-Edwards boundaries: the faces normal to y slide along x.
    pub shearing: bool,

    /// Explicit cell count per dimension.  `None` sizes the grid from the
    /// interaction range and number density.
    pub cell_counts: Option<Vec<usize>>,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            overlink:          1,
            interaction_range: 1.0,
            shearing:          false,
            cell_counts:       None,
        }
    }
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// Top-level scheduler configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    pub fel:      FelStrategy,
    pub pel:      PelStrategy,
    pub calendar: CalendarConfig,
    pub cells:    CellConfig,

    /// Negative event times down to `-negative_time_tolerance` are numerical
    /// noise and are clamped to zero.  Anything earlier is an anomaly.
    pub negative_time_tolerance: f64,

    /// Treat anomalies (causality violations) as fatal.
    pub strict: bool,

    /// Consecutive revalidation rejections tolerated before an event is
    /// dispatched without re-checking.
    pub rejection_limit: usize,

    pub neighbour_policy: NeighbourPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fel:                     FelStrategy::default(),
            pel:                     PelStrategy::default(),
            calendar:                CalendarConfig::default(),
            cells:                   CellConfig::default(),
            negative_time_tolerance: 1e-10,
            strict:                  false,
            rejection_limit:         10,
            neighbour_policy:        NeighbourPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Check every field that can be checked without knowing the system size.
    pub fn validate(&self) -> CoreResult<()> {
        let cells = &self.cells;
        if cells.overlink == 0 {
            return Err(CoreError::Config("cell overlink must be at least 1".into()));
        }
        if !(cells.interaction_range.is_finite() && cells.interaction_range > 0.0) {
            return Err(CoreError::Config(format!(
                "interaction range must be positive and finite, got {}",
                cells.interaction_range
            )));
        }
        if let Some(counts) = &cells.cell_counts {
            if let Some(dim) = counts.iter().position(|&c| c == 0) {
                return Err(CoreError::Config(format!(
                    "cell count in dimension {dim} must be positive"
                )));
            }
        }
        if !(self.negative_time_tolerance >= 0.0) {
            return Err(CoreError::Config(format!(
                "negative time tolerance must be non-negative, got {}",
                self.negative_time_tolerance
            )));
        }
        if self.calendar.initial_lists == Some(0) {
            return Err(CoreError::Config("calendar list count must be positive".into()));
        }
        Ok(())
    }
}
