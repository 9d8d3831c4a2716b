//! `edmd-sched` — the event loop of the edmd simulation core.
//!
//! # Collaborators
//!
//! | Trait                 | Supplies                                             |
//! |-----------------------|------------------------------------------------------|
//! | [`World`]             | particle positions, cell-exit times, clock streaming |
//! | [`EventSource`]       | predictions and dispatch for one family of events    |
//! | [`SchedulerObserver`] | progress and data-collection hooks                   |
//!
//! The scheduler owns one [`FutureEventList`](edmd_fel::FutureEventList) and
//! one [`CellList`](edmd_cells::CellList).  Sources only see the world; they
//! never touch either queue.
//!
//! # Entity states
//!
//! ```text
//! Uninitialized ──predict──▶ Valid ──event names it / new neighbour──▶ Stale
//!                              ▲                                        │
//!                              └──────────────── predict ───────────────┘
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | [`ensemble::run_all`] runs replicas on Rayon's pool.   |
//! | `serde`    | Serializable [`Checkpoint`] and [`SchedulerStats`].    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use edmd_core::SchedulerConfig;
//! use edmd_sched::{NoopObserver, SchedulerBuilder};
//!
//! let mut sched = SchedulerBuilder::new(SchedulerConfig::default(), gas)
//!     .source(HardDiscs::new(1.0))
//!     .build()?;
//! sched.run(100_000, &mut NoopObserver)?;
//! ```

pub mod builder;
pub mod checkpoint;
pub mod ensemble;
pub mod error;
pub mod halt;
pub mod observer;
pub mod scheduler;
pub mod source;
pub mod world;

#[cfg(test)]
mod tests;

pub use builder::SchedulerBuilder;
pub use checkpoint::{Checkpoint, RunOutcome, SchedulerStats};
pub use error::{SchedError, SchedResult, SourceError, SourceResult};
pub use halt::HaltHandle;
pub use observer::{NoopObserver, SchedulerObserver};
pub use scheduler::{EntityState, Scheduler, Step};
pub use source::EventSource;
pub use world::{BoxExit, World};
