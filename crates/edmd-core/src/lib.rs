//! `edmd-core` — foundational types for the `edmd` event-driven simulation core.
//!
//! This crate is a dependency of every other `edmd-*` crate.  It has no
//! `edmd-*` dependencies and keeps external ones to `rand`, `rustc-hash` and
//! `thiserror`, plus optional `serde`.
//!
//! # What lives here
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`ids`]    | `ParticleId`, `CellId`, `SourceId`                          |
//! | [`pairs`]  | `PairKey`, `PairMap`, `PairSet`                             |
//! | [`config`] | `SchedulerConfig`, `FelStrategy`, `PelStrategy`, …          |
//! | [`rng`]    | `SimRng` (seeded `SmallRng` + exponential sampling)         |
//! | [`error`]  | `CoreError`, `CoreResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and configuration.   |

pub mod config;
pub mod error;
pub mod ids;
pub mod pairs;
pub mod rng;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{
    CalendarConfig, CellConfig, FelStrategy, NeighbourPolicy, PelStrategy, SchedulerConfig,
};
pub use error::{CoreError, CoreResult};
pub use ids::{CellId, ParticleId, SourceId};
pub use pairs::{PairKey, PairMap, PairSet};
pub use rng::SimRng;
