//! `edmd-event` — event values and per-particle pending-event lists.
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`event`]   | `Event`, `EventKind`, `PredictionKey`                     |
//! | [`minmax`]  | `MinMaxHeap<N>`: fixed-capacity double-ended heap         |
//! | [`pel`]     | `PendingEventList` trait, `MinMaxPel<N>`, `HeapPel`       |
//!
//! Every particle owns exactly one PEL.  The global future event list in
//! `edmd-fel` only ever looks at each PEL's `top()`.

pub mod event;
pub mod minmax;
pub mod pel;


pub use event::{Event, EventKind, NEVER, PredictionKey};
pub use minmax::MinMaxHeap;
pub use pel::{HeapPel, MinMaxPel, PendingEventList};
