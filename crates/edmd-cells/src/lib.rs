//! `edmd-cells` — spatial decomposition for neighbour search.
//!
//! The primary box, centred on the origin, is cut into a regular grid of
//! cells.  Each cell holds an intrusive doubly linked list of resident
//! particle ids, so moving a particle between cells is O(1).
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`boundary`] | `Boundary` trait, `PeriodicBox`, `LeesEdwards`            |
//! | [`ordering`] | `RowMajorOrdering<D>`: cell coordinate ⇄ linear index     |
//! | [`geometry`] | `CellGeometry<D>`: grid sizing and position → cell        |
//! | [`list`]     | `CellList<D>`, `Transition`                               |
//! | `shear`      | extra neighbour strip for Lees-Edwards boundaries         |
//! | [`error`]    | `CellError`, `CellResult<T>`                              |
//!
//! # Neighbourhoods
//!
//! A particle's neighbourhood is every cell within `overlink` cells of its
//! own in each dimension, wrapped periodically.  When shearing is enabled,
//! dimension 0 is the flow direction and dimension 1 the gradient
//! direction: cells within `overlink` rows of a y face additionally see the
//! whole of the rows they reach across that face, because the offset
//! between the two faces changes continuously.

pub mod boundary;
pub mod error;
pub mod geometry;
pub mod list;
pub mod ordering;
mod shear;


pub use boundary::{Boundary, LeesEdwards, PeriodicBox, wrap_periodic};
pub use error::{CellError, CellResult};
pub use geometry::CellGeometry;
pub use list::{CellList, Transition};
pub use ordering::RowMajorOrdering;
