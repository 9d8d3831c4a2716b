//! `edmd-fel` — the global future event list.
//!
//! A FEL holds exactly one PEL per particle and answers one question fast:
//! which particle owns the earliest event?  Two strategies implement the
//! [`FutureEventList`] trait:
//!
//! | Strategy        | Structure                                    | Cost per event         |
//! |-----------------|----------------------------------------------|------------------------|
//! | [`TreeFel`]     | complete binary tree over particle ids       | O(log N)               |
//! | [`CalendarFel`] | time buckets + tree over the current bucket  | amortized O(1)         |
//! | [`ScanFel`]     | linear scan over every PEL                   | O(N), reference only   |
//!
//! # Shared mechanics
//!
//! - **Peculiar time.**  Stored times are offset by a single running
//!   `pec_time`, so [`FutureEventList::stream`] is O(1).  The offset is
//!   folded back into the PELs periodically.
//! - **Lazy deletion.**  [`FutureEventList::invalidate`] clears one PEL and
//!   bumps that particle's generation.  Events elsewhere that name it as
//!   secondary carry the old generation and are dropped when they surface.
//! - **Deferred updates.**  Consecutive pushes to one particle reposition
//!   it in the queue once, when another particle is touched or the top is
//!   requested.
//!
//! Use [`build_fel`] to construct the strategy named by a
//! [`SchedulerConfig`](edmd_core::SchedulerConfig).

mod arena;
pub mod build;
pub mod calendar;
pub mod cbt;
pub mod error;
pub mod fel;
pub mod scan;
pub mod tree;


pub use build::build_fel;
pub use calendar::CalendarFel;
pub use error::{FelError, FelResult};
pub use fel::{FelStats, FutureEventList};
pub use scan::ScanFel;
pub use tree::TreeFel;
